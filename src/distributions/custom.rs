//! User-defined priors exposing bare `sample`/`log_prob` methods

use super::{Distribution, Support};
use crate::config::CustomPriorOptions;
use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Tensor, Value};
use ndarray::Axis;
use rand::RngCore;
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Failure of a call into a custom prior
#[derive(Error, Debug)]
pub enum PriorCallError {
    /// The prior does not provide the method
    #[error("prior has no method `{0}`")]
    Missing(&'static str),

    /// The method rejects the calling convention, e.g. a batch-shape argument
    #[error("unsupported call signature: {0}")]
    Signature(String),

    /// Any other failure inside the method
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl From<PriorCallError> for SbiInputError {
    fn from(err: PriorCallError) -> Self {
        match err {
            PriorCallError::Missing(method) => {
                SbiInputError::missing_method(format!("Prior needs method `.{}()`.", method))
            },
            PriorCallError::Signature(msg) => SbiInputError::calling_convention(msg),
            PriorCallError::Failed(err) => SbiInputError::invalid_value(format!("{:#}", err)),
        }
    }
}

/// A prior that is not a [`Distribution`]
///
/// Only `sample` and `log_prob` are needed. The default implementations report
/// the method as missing, so implementors override what they provide.
pub trait CustomPrior: Send + Sync {
    /// Draw a batch of parameters of `sample_shape`
    fn sample(
        &self,
        sample_shape: &[usize],
        rng: &mut dyn RngCore,
    ) -> std::result::Result<Value, PriorCallError> {
        let _ = (sample_shape, rng);
        Err(PriorCallError::Missing("sample"))
    }

    /// Log-density of a batch of parameters
    fn log_prob(&self, theta: &Value) -> std::result::Result<Value, PriorCallError> {
        let _ = theta;
        Err(PriorCallError::Missing("log_prob"))
    }

    fn mean(&self) -> Option<Value> {
        None
    }

    fn variance(&self) -> Option<Value> {
        None
    }
}

/// Distribution view of a [`CustomPrior`]
///
/// Samples and log-densities are returned as `float32` tensors. Priors that
/// return host arrays receive host arrays in `log_prob`. When the prior has no
/// mean or variance, both are estimated from samples at construction.
pub struct CustomPriorWrapper {
    prior: Box<dyn CustomPrior>,
    event_shape: Vec<usize>,
    returns_ndarray: bool,
    support: Support,
    mean: Tensor,
    variance: Tensor,
    estimated_moments: bool,
    validate_args: bool,
}

impl CustomPriorWrapper {
    /// Wrap `prior` with the given event shape
    ///
    /// # Errors
    /// - Invalid `options`
    /// - Sampling failures while estimating moments
    pub fn new(
        prior: Box<dyn CustomPrior>,
        event_shape: Vec<usize>,
        returns_ndarray: bool,
        options: &CustomPriorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        options.validate()?;
        let support = match (&options.lower_bound, &options.upper_bound) {
            (None, None) => Support::Real,
            (Some(lower), None) => Support::GreaterThan(lower.clone()),
            (None, Some(upper)) => Support::LessThan(upper.clone()),
            (Some(lower), Some(upper)) => Support::Interval {
                low: lower.clone(),
                high: upper.clone(),
            },
        };

        let provided = prior.mean().zip(prior.variance());
        let (mean, variance, estimated_moments) = match provided {
            Some((mean, variance)) => (mean.to_tensor(DType::F32), variance.to_tensor(DType::F32), false),
            None => {
                let samples = Self::draw(prior.as_ref(), &[options.moment_samples], rng)?;
                let (mean, variance) = sample_moments(&samples)?;
                (mean, variance, true)
            },
        };

        Ok(Self {
            prior,
            event_shape,
            returns_ndarray,
            support,
            mean,
            variance,
            estimated_moments,
            validate_args: false,
        })
    }

    /// Whether the prior returned host arrays before wrapping
    #[must_use]
    pub fn returns_ndarray(&self) -> bool {
        self.returns_ndarray
    }

    /// Whether mean and variance were estimated from samples
    #[must_use]
    pub fn estimated_moments(&self) -> bool {
        self.estimated_moments
    }

    fn draw(prior: &dyn CustomPrior, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        Ok(prior.sample(sample_shape, rng)?.to_tensor(DType::F32))
    }
}

fn sample_moments(samples: &Tensor) -> Result<(Tensor, Tensor)> {
    let values = samples.to_f64_array();
    if values.ndim() == 0 || values.len_of(Axis(0)) < 2 {
        return Err(SbiInputError::invalid_value(format!(
            "Estimating prior moments needs at least 2 samples, got shape {:?}",
            values.shape()
        )));
    }
    let mean = values
        .mean_axis(Axis(0))
        .ok_or_else(|| SbiInputError::invalid_value("Cannot estimate the mean of zero samples"))?;
    let variance = values.var_axis(Axis(0), 1.0);
    Ok((
        Tensor::from_f64(mean).to_dtype(DType::F32),
        Tensor::from_f64(variance).to_dtype(DType::F32),
    ))
}

impl fmt::Debug for CustomPriorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPriorWrapper")
            .field("event_shape", &self.event_shape)
            .field("returns_ndarray", &self.returns_ndarray)
            .field("support", &self.support)
            .field("estimated_moments", &self.estimated_moments)
            .finish_non_exhaustive()
    }
}

impl Distribution for CustomPriorWrapper {
    fn name(&self) -> &'static str {
        "CustomPriorWrapper"
    }

    fn batch_shape(&self) -> Vec<usize> {
        Vec::new()
    }

    fn event_shape(&self) -> Vec<usize> {
        self.event_shape.clone()
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        Self::draw(self.prior.as_ref(), sample_shape, rng)
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        if self.validate_args {
            if let Some(position) = self.support.check(value).iter().position(|inside| !inside) {
                return Err(SbiInputError::invalid_value(format!(
                    "Expected value argument to be within the support of {}, event {} is not",
                    self.name(),
                    position
                )));
            }
        }
        let theta = if self.returns_ndarray {
            Value::NdArray(value.to_f64_array())
        } else {
            Value::Tensor(value.clone())
        };
        Ok(self.prior.log_prob(&theta)?.to_tensor(DType::F32))
    }

    fn support(&self) -> Option<Support> {
        Some(self.support.clone())
    }

    fn mean(&self) -> Result<Tensor> {
        Ok(self.mean.clone())
    }

    fn variance(&self) -> Result<Tensor> {
        Ok(self.variance.clone())
    }

    fn validate_args(&self) -> bool {
        self.validate_args
    }

    fn set_validate_args(&mut self, validate: bool) {
        self.validate_args = validate;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{ArrayD, IxDyn};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Uniform on [0, 1]^2 returning host arrays
    struct UnitSquare;

    impl CustomPrior for UnitSquare {
        fn sample(
            &self,
            sample_shape: &[usize],
            rng: &mut dyn RngCore,
        ) -> std::result::Result<Value, PriorCallError> {
            let mut shape = sample_shape.to_vec();
            shape.push(2);
            let n: usize = shape.iter().product();
            let values: Vec<f64> = (0..n).map(|_| rng.random::<f64>()).collect();
            let array = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(anyhow::Error::from)?;
            Ok(Value::NdArray(array))
        }

        fn log_prob(&self, theta: &Value) -> std::result::Result<Value, PriorCallError> {
            let batch = theta.leading_dim().unwrap_or(1);
            Ok(Value::NdArray(ArrayD::zeros(IxDyn(&[batch]))))
        }
    }

    struct WithMoments;

    impl CustomPrior for WithMoments {
        fn sample(
            &self,
            sample_shape: &[usize],
            _rng: &mut dyn RngCore,
        ) -> std::result::Result<Value, PriorCallError> {
            let mut shape = sample_shape.to_vec();
            shape.push(1);
            Ok(Value::Tensor(Tensor::zeros(&shape, DType::F64)))
        }

        fn mean(&self) -> Option<Value> {
            Some(Value::Sequence(vec![3.0]))
        }

        fn variance(&self) -> Option<Value> {
            Some(Value::Sequence(vec![4.0]))
        }
    }

    #[test]
    fn test_missing_methods_by_default() {
        struct Empty;
        impl CustomPrior for Empty {}

        let mut rng = StdRng::seed_from_u64(0);
        let err = Empty.sample(&[1], &mut rng).unwrap_err();
        assert!(matches!(err, PriorCallError::Missing("sample")));
        let err: SbiInputError = Empty.log_prob(&Value::Scalar(0.0)).unwrap_err().into();
        assert!(matches!(err, SbiInputError::MissingMethod(_)));
    }

    #[test]
    fn test_wrapper_returns_f32_tensors() {
        let mut rng = StdRng::seed_from_u64(1);
        let wrapper = CustomPriorWrapper::new(
            Box::new(UnitSquare),
            vec![2],
            true,
            &CustomPriorOptions::default(),
            &mut rng,
        )
        .unwrap();

        let samples = wrapper.sample(&[5], &mut rng).unwrap();
        assert_eq!(samples.shape(), &[5, 2]);
        assert_eq!(samples.dtype(), DType::F32);
        assert_eq!(wrapper.log_prob(&samples).unwrap().shape(), &[5]);
        assert!(wrapper.returns_ndarray());
    }

    #[test]
    fn test_moments_estimated_from_samples() {
        let mut rng = StdRng::seed_from_u64(2);
        let options = CustomPriorOptions::builder().moment_samples(4000).build().unwrap();
        let wrapper =
            CustomPriorWrapper::new(Box::new(UnitSquare), vec![2], true, &options, &mut rng).unwrap();

        assert!(wrapper.estimated_moments());
        let mean = wrapper.mean().unwrap().to_vec_f64();
        let variance = wrapper.variance().unwrap().to_vec_f64();
        assert_eq!(mean.len(), 2);
        assert_relative_eq!(mean[0], 0.5, epsilon = 0.05);
        assert_relative_eq!(variance[1], 1.0 / 12.0, epsilon = 0.01);
    }

    #[test]
    fn test_provided_moments_are_used() {
        let mut rng = StdRng::seed_from_u64(3);
        let wrapper = CustomPriorWrapper::new(
            Box::new(WithMoments),
            vec![1],
            false,
            &CustomPriorOptions::default(),
            &mut rng,
        )
        .unwrap();
        assert!(!wrapper.estimated_moments());
        assert_eq!(wrapper.mean().unwrap().to_vec_f64(), vec![3.0]);
        assert_eq!(wrapper.variance().unwrap().to_vec_f64(), vec![4.0]);
    }

    #[test]
    fn test_support_from_bounds() {
        let mut rng = StdRng::seed_from_u64(4);
        let options = CustomPriorOptions::builder().lower_bound(vec![0.0]).build().unwrap();
        let mut wrapper =
            CustomPriorWrapper::new(Box::new(UnitSquare), vec![2], true, &options, &mut rng).unwrap();
        assert_eq!(wrapper.support(), Some(Support::GreaterThan(vec![0.0])));

        let outside = Tensor::from_shape_vec(&[1, 2], vec![-1.0, 0.5]).unwrap();
        assert!(wrapper.log_prob(&outside).is_ok());
        wrapper.set_validate_args(true);
        assert!(wrapper.log_prob(&outside).is_err());
    }
}
