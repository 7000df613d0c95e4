//! Shared priors, simulators and helpers for integration tests

#![allow(dead_code)]

use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution as _, StandardNormal};
use sbi_input_checks::distributions::{CustomPrior, PriorCallError};
use sbi_input_checks::{DType, Tensor, Value};

pub type CallResult = std::result::Result<Value, PriorCallError>;

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn with_event(sample_shape: &[usize], dim: usize) -> Vec<usize> {
    let mut shape = sample_shape.to_vec();
    shape.push(dim);
    shape
}

/// Standard normal over `dim` parameters returning host arrays
pub struct NdArrayGaussian {
    pub dim: usize,
}

impl CustomPrior for NdArrayGaussian {
    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> CallResult {
        let shape = with_event(sample_shape, self.dim);
        let n: usize = shape.iter().product();
        let values: Vec<f64> = (0..n).map(|_| StandardNormal.sample(&mut *rng)).collect();
        let array = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(anyhow::Error::from)?;
        Ok(Value::NdArray(array))
    }

    fn log_prob(&self, theta: &Value) -> CallResult {
        let Value::NdArray(theta) = theta else {
            return Err(PriorCallError::Signature("expects an ndarray".into()));
        };
        let half_log_2pi = 0.5 * (2.0 * std::f64::consts::PI).ln();
        let log_probs = theta.map_axis(ndarray::Axis(theta.ndim() - 1), |row| {
            row.iter().map(|v| -0.5 * v * v - half_log_2pi).sum::<f64>()
        });
        Ok(Value::NdArray(log_probs))
    }
}

/// Uniform on [0, 1]^dim returning `float64` tensors, with known moments
pub struct TensorUnitBox {
    pub dim: usize,
}

impl CustomPrior for TensorUnitBox {
    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> CallResult {
        let shape = with_event(sample_shape, self.dim);
        let n: usize = shape.iter().product();
        let values: Vec<f64> = (0..n).map(|_| rng.random::<f64>()).collect();
        let array = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(anyhow::Error::from)?;
        Ok(Value::Tensor(Tensor::from_f64(array)))
    }

    fn log_prob(&self, theta: &Value) -> CallResult {
        let batch = theta.shape().split_last().map(|(_, lead)| lead.to_vec()).unwrap_or_default();
        Ok(Value::Tensor(Tensor::zeros(&batch, DType::F64)))
    }

    fn mean(&self) -> Option<Value> {
        Some(Value::Sequence(vec![0.5; self.dim]))
    }

    fn variance(&self) -> Option<Value> {
        Some(Value::Sequence(vec![1.0 / 12.0; self.dim]))
    }
}

/// Prior whose `sample` takes no batch shape
pub struct NoBatchArgument;

impl CustomPrior for NoBatchArgument {
    fn sample(&self, sample_shape: &[usize], _rng: &mut dyn RngCore) -> CallResult {
        if sample_shape.is_empty() {
            Ok(Value::Sequence(vec![0.0]))
        } else {
            Err(PriorCallError::Signature(format!(
                "sample() takes 0 positional arguments but got {:?}",
                sample_shape
            )))
        }
    }

    fn log_prob(&self, _theta: &Value) -> CallResult {
        Ok(Value::Scalar(0.0))
    }
}

/// Prior with `log_prob` only
pub struct DensityOnly;

impl CustomPrior for DensityOnly {
    fn log_prob(&self, _theta: &Value) -> CallResult {
        Ok(Value::Scalar(0.0))
    }
}

/// Prior returning bare scalars
pub struct ScalarPrior;

impl CustomPrior for ScalarPrior {
    fn sample(&self, _sample_shape: &[usize], rng: &mut dyn RngCore) -> CallResult {
        Ok(Value::Scalar(rng.random::<f64>()))
    }

    fn log_prob(&self, _theta: &Value) -> CallResult {
        Ok(Value::Scalar(0.0))
    }
}

/// Batched simulator adding one to every parameter
pub fn shift_simulator(theta: &Value) -> anyhow::Result<Value> {
    Ok(Value::NdArray(theta.to_f64_array().mapv(|v| v + 1.0)))
}

/// Simulator that only accepts one parameter vector and returns its sum
pub fn sum_simulator(theta: &Value) -> anyhow::Result<Value> {
    anyhow::ensure!(theta.shape().len() == 1, "expected a single parameter vector");
    Ok(Value::Scalar(theta.to_f64_array().sum()))
}

/// Simulator emitting a 4x4 image per parameter vector
pub fn image_simulator(theta: &Value) -> anyhow::Result<Value> {
    let batch = theta.leading_dim().unwrap_or(1);
    Ok(Value::NdArray(ArrayD::zeros(IxDyn(&[batch, 4, 4]))))
}

pub fn zeros(shape: &[usize]) -> Tensor {
    Tensor::zeros(shape, DType::F32)
}

/// Prior sampling tensors but evaluating densities as host arrays
pub struct MixedReturns;

impl CustomPrior for MixedReturns {
    fn sample(&self, sample_shape: &[usize], _rng: &mut dyn RngCore) -> CallResult {
        Ok(Value::Tensor(Tensor::zeros(&with_event(sample_shape, 2), DType::F32)))
    }

    fn log_prob(&self, theta: &Value) -> CallResult {
        let batch = theta.leading_dim().unwrap_or(1);
        Ok(Value::NdArray(ArrayD::zeros(IxDyn(&[batch]))))
    }
}
