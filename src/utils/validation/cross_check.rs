//! Cross-checks between priors, simulators, training data and estimators

use crate::distributions::Distribution;
use crate::error::{Result, SbiInputError};
use crate::estimator::{EstimatorArg, NeuralNet};
use crate::processing::Simulator;
use crate::tensor::{DType, Device, Tensor, Value};
use crate::types::InputWarning;
use crate::utils::validation::PriorValidator;
use rand::RngCore;

/// Validator for prior/simulator consistency and training inputs
pub struct CrossCheckValidator;

impl CrossCheckValidator {
    /// Run prior and simulator once and check that both keep the batch dimension
    ///
    /// # Errors
    /// - `NotImplemented` when the prior cannot check its support
    /// - `Simulation` when the simulator fails
    /// - `Assertion` when the simulation is not a tensor or a batch size is not one
    pub fn check_sbi_inputs<S: Simulator + ?Sized>(
        simulator: &S,
        prior: &dyn Distribution,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        const NUM_PRIOR_SAMPLES: usize = 1;

        PriorValidator::check_prior_support(prior, rng)?;
        let theta = prior.sample(&[NUM_PRIOR_SAMPLES], rng)?;
        let simulation = simulator
            .simulate(&Value::Tensor(theta.clone()))
            .map_err(SbiInputError::Simulation)?;
        let simulation = match simulation {
            Value::Tensor(simulation) => simulation,
            other => {
                return Err(SbiInputError::assertion(format!(
                    "Simulator output must be a `Tensor`, got {}.",
                    other.type_name()
                )))
            },
        };

        if theta.batch_size() != Some(NUM_PRIOR_SAMPLES) {
            return Err(SbiInputError::assertion(format!(
                "Theta batch shape {:?} must match num_samples={}.",
                theta.batch_size(),
                NUM_PRIOR_SAMPLES
            )));
        }
        if simulation.batch_size() != Some(NUM_PRIOR_SAMPLES) {
            return Err(SbiInputError::assertion(format!(
                "Simulation batch shape {:?} must match num_samples={}.",
                simulation.batch_size(),
                NUM_PRIOR_SAMPLES
            )));
        }
        log::debug!(
            "Input check passed: theta {:?}, x {:?}",
            theta.shape(),
            simulation.shape()
        );
        Ok(())
    }

    /// Check a training pair and move it to `data_device`
    ///
    /// A tensor on another device is moved with a warning naming the data
    /// and training devices.
    ///
    /// # Errors
    /// - `Assertion` when either is not a tensor, the batch sizes differ or a
    ///   dtype is not `float32`
    pub fn validate_theta_and_x(
        theta: Value,
        x: Value,
        data_device: Device,
        training_device: Device,
    ) -> Result<(Tensor, Tensor)> {
        let Value::Tensor(theta) = theta else {
            return Err(SbiInputError::assertion("Parameters theta must be a `Tensor`."));
        };
        let Value::Tensor(x) = x else {
            return Err(SbiInputError::assertion("Simulator output must be a `Tensor`."));
        };

        if theta.batch_size().is_none() || theta.batch_size() != x.batch_size() {
            return Err(SbiInputError::assertion(format!(
                "Number of parameter sets (={}) must match the number of simulation outputs (={})",
                describe_batch(&theta),
                describe_batch(&x)
            )));
        }
        if theta.dtype() != DType::F32 {
            return Err(SbiInputError::assertion("Type of parameters must be float32."));
        }
        if x.dtype() != DType::F32 {
            return Err(SbiInputError::assertion("Type of simulator outputs must be float32."));
        }

        let x = Self::relocate("Data x", x, data_device, training_device);
        let theta = Self::relocate("Parameters theta", theta, data_device, training_device);
        Ok((theta, x))
    }

    fn relocate(name: &'static str, tensor: Tensor, data_device: Device, training_device: Device) -> Tensor {
        if tensor.device() == data_device {
            return tensor;
        }
        InputWarning::DataRelocated {
            tensor: name,
            from: tensor.device(),
            data_device,
            training_device,
        }
        .emit();
        tensor.with_device(data_device)
    }

    /// Both tensors live on the same device
    ///
    /// # Errors
    /// - `Assertion` naming both devices
    pub fn check_data_device(datum_1: &Tensor, datum_2: &Tensor) -> Result<()> {
        if datum_1.device() != datum_2.device() {
            return Err(SbiInputError::assertion(format!(
                "Mismatch in fed data's device: datum_1 has device '{}' whereas datum_2 has \
                 device '{}'. Please use data from a common device.",
                datum_1.device(),
                datum_2.device()
            )));
        }
        Ok(())
    }

    /// The estimator is a name or a network builder, not an instantiated network
    ///
    /// # Errors
    /// - `Assertion` for an instantiated network
    pub fn check_estimator_arg(estimator: &EstimatorArg) -> Result<()> {
        match estimator {
            EstimatorArg::Name(_) | EstimatorArg::Builder(_) => Ok(()),
            EstimatorArg::Network(_) => Err(SbiInputError::assertion(format!(
                "The passed density estimator / classifier must be a string or a function \
                 returning a network, but is {}",
                estimator.type_name()
            ))),
        }
    }

    /// Evaluate the density of the first two parameters of the first two
    /// samples to surface shape problems early
    ///
    /// Nets that are not density estimators pass unchecked.
    ///
    /// # Errors
    /// - `EstimatorFailure` wrapping the estimator error; the hint mentions the
    ///   dimensionality of `x` when it has more than one data dimension
    /// - `InvalidValue` when `theta` or `x` cannot be sliced
    pub fn test_posterior_net_for_multi_d_x(
        net: &dyn NeuralNet,
        theta: &Tensor,
        x: &Tensor,
    ) -> Result<()> {
        let Some(estimator) = net.as_density_estimator() else {
            return Ok(());
        };
        let theta = theta.narrow(1, 0, 2)?;
        let condition = x.narrow(0, 0, 2)?;
        estimator
            .log_prob(&theta, &condition)
            .map(|_| ())
            .map_err(|source| SbiInputError::EstimatorFailure {
                hint: multi_d_hint(x.ndim()),
                source,
            })
    }
}

fn describe_batch(tensor: &Tensor) -> String {
    tensor
        .batch_size()
        .map_or_else(|| "none, zero-dimensional".to_string(), |n| n.to_string())
}

fn multi_d_hint(ndims: usize) -> String {
    if ndims <= 2 {
        return String::new();
    }
    format!(
        "Debug hint: The simulated data x has {} dimensions. With default settings, density \
         estimators cannot deal with multidimensional simulations. Make sure to use an \
         embedding net that reduces the dimensionality, e.g., a CNN in case of images, or \
         change the simulator to return one-dimensional x.",
        ndims - 1
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::BoxUniform;
    use crate::estimator::DensityEstimator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zeros(shape: &[usize]) -> Tensor {
        Tensor::zeros(shape, DType::F32)
    }

    /// Flattening estimator that only accepts two-dimensional conditions
    struct FlatEstimator;

    impl DensityEstimator for FlatEstimator {
        fn log_prob(&self, input: &Tensor, condition: &Tensor) -> anyhow::Result<Tensor> {
            anyhow::ensure!(condition.ndim() == 2, "mat1 and mat2 shapes cannot be multiplied");
            Ok(zeros(&[input.shape()[0]]))
        }
    }

    impl NeuralNet for FlatEstimator {
        fn name(&self) -> &str {
            "flat"
        }

        fn as_density_estimator(&self) -> Option<&dyn DensityEstimator> {
            Some(self)
        }
    }

    struct Classifier;

    impl NeuralNet for Classifier {
        fn name(&self) -> &str {
            "classifier"
        }
    }

    #[test]
    fn test_validate_theta_and_x_passes_through() {
        let theta = zeros(&[5, 2]);
        let x = zeros(&[5, 3]);
        let (t, v) = CrossCheckValidator::validate_theta_and_x(
            Value::Tensor(theta.clone()),
            Value::Tensor(x.clone()),
            Device::Cpu,
            Device::Cpu,
        )
        .unwrap();
        assert_eq!(t, theta);
        assert_eq!(v, x);
    }

    #[test]
    fn test_validate_theta_and_x_failures() {
        let err = CrossCheckValidator::validate_theta_and_x(
            Value::Tensor(zeros(&[5, 2])),
            Value::Tensor(zeros(&[4, 3])),
            Device::Cpu,
            Device::Cpu,
        )
        .unwrap_err();
        assert!(matches!(err, SbiInputError::Assertion(_)));
        assert!(err.to_string().contains("(=5)"));

        let err = CrossCheckValidator::validate_theta_and_x(
            Value::Tensor(zeros(&[5, 2]).to_dtype(DType::F64)),
            Value::Tensor(zeros(&[5, 3])),
            Device::Cpu,
            Device::Cpu,
        )
        .unwrap_err();
        assert!(err.to_string().contains("parameters must be float32"));

        let err = CrossCheckValidator::validate_theta_and_x(
            Value::Sequence(vec![1.0]),
            Value::Tensor(zeros(&[1, 3])),
            Device::Cpu,
            Device::Cpu,
        )
        .unwrap_err();
        assert!(err.to_string().contains("theta must be a `Tensor`"));
    }

    #[test]
    fn test_validate_theta_and_x_relocates() {
        let (theta, x) = CrossCheckValidator::validate_theta_and_x(
            Value::Tensor(zeros(&[2, 1]).with_device(Device::Cuda(0))),
            Value::Tensor(zeros(&[2, 1])),
            Device::Cpu,
            Device::Cuda(0),
        )
        .unwrap();
        assert_eq!(theta.device(), Device::Cpu);
        assert_eq!(x.device(), Device::Cpu);
    }

    #[test]
    fn test_check_data_device() {
        let a = zeros(&[1]);
        let b = zeros(&[1]).with_device(Device::Mps);
        assert!(CrossCheckValidator::check_data_device(&a, &a).is_ok());
        let err = CrossCheckValidator::check_data_device(&a, &b).unwrap_err();
        assert!(err.to_string().contains("'cpu'"));
        assert!(err.to_string().contains("'mps'"));
    }

    #[test]
    fn test_check_estimator_arg() {
        assert!(CrossCheckValidator::check_estimator_arg(&EstimatorArg::name("maf")).is_ok());
        let builder = EstimatorArg::builder(|_theta, _x| Ok(Box::new(Classifier) as Box<dyn NeuralNet>));
        assert!(CrossCheckValidator::check_estimator_arg(&builder).is_ok());
        let network = EstimatorArg::Network(Box::new(Classifier));
        assert!(CrossCheckValidator::check_estimator_arg(&network).is_err());
    }

    #[test]
    fn test_posterior_net_hint_depends_on_x_dims() {
        let theta = zeros(&[4, 3]);
        assert!(CrossCheckValidator::test_posterior_net_for_multi_d_x(&FlatEstimator, &theta, &zeros(&[4, 5]))
            .is_ok());

        let err = CrossCheckValidator::test_posterior_net_for_multi_d_x(
            &FlatEstimator,
            &theta,
            &zeros(&[4, 8, 8]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Debug hint: The simulated data x has 2 dimensions"));
        assert!(std::error::Error::source(&err).is_some());

        // Nets without a density are not probed
        assert!(CrossCheckValidator::test_posterior_net_for_multi_d_x(&Classifier, &theta, &zeros(&[4, 8, 8]))
            .is_ok());
    }

    #[test]
    fn test_check_sbi_inputs() {
        let mut rng = StdRng::seed_from_u64(0);
        let prior = BoxUniform::from_bounds(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        let batched = |theta: &Value| -> anyhow::Result<Value> { Ok(theta.clone()) };
        assert!(CrossCheckValidator::check_sbi_inputs(&batched, &prior, &mut rng).is_ok());

        let drops_batch = |theta: &Value| -> anyhow::Result<Value> {
            Ok(Value::NdArray(theta.to_f64_array().sum_axis(ndarray::Axis(0))))
        };
        let err = CrossCheckValidator::check_sbi_inputs(&drops_batch, &prior, &mut rng).unwrap_err();
        assert!(matches!(err, SbiInputError::Assertion(_)));
    }
}
