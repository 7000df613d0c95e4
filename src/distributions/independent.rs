//! Reinterpretation of batch dimensions as event dimensions

use super::{concat_shapes, Distribution, Support, Uniform};
use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Tensor};
use ndarray::ArrayD;
use rand::RngCore;
use std::any::Any;

/// Treats the trailing `reinterpreted_batch_ndims` batch dimensions of the base
/// distribution as event dimensions; their log-densities are summed.
#[derive(Debug)]
pub struct Independent {
    base: Box<dyn Distribution>,
    reinterpreted_batch_ndims: usize,
}

impl Independent {
    pub fn new(base: Box<dyn Distribution>, reinterpreted_batch_ndims: usize) -> Result<Self> {
        let batch_ndims = base.batch_shape().len();
        if reinterpreted_batch_ndims > batch_ndims {
            return Err(SbiInputError::invalid_value(format!(
                "Cannot reinterpret {} batch dimensions of {} with batch shape {:?}",
                reinterpreted_batch_ndims,
                base.name(),
                base.batch_shape()
            )));
        }
        Ok(Self {
            base,
            reinterpreted_batch_ndims,
        })
    }

    #[must_use]
    pub fn base(&self) -> &dyn Distribution {
        self.base.as_ref()
    }

    #[must_use]
    pub fn reinterpreted_batch_ndims(&self) -> usize {
        self.reinterpreted_batch_ndims
    }

    fn split_batch(&self) -> (Vec<usize>, Vec<usize>) {
        let batch = self.base.batch_shape();
        let split = batch.len() - self.reinterpreted_batch_ndims;
        let (outer, inner) = batch.split_at(split);
        (outer.to_vec(), inner.to_vec())
    }
}

impl Distribution for Independent {
    fn name(&self) -> &'static str {
        "Independent"
    }

    fn batch_shape(&self) -> Vec<usize> {
        self.split_batch().0
    }

    fn event_shape(&self) -> Vec<usize> {
        concat_shapes(&self.split_batch().1, &self.base.event_shape())
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        self.base.sample(sample_shape, rng)
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        let mut log_prob = self.base.log_prob(value)?;
        for _ in 0..self.reinterpreted_batch_ndims {
            log_prob = log_prob.sum_axis(log_prob.ndim().saturating_sub(1))?;
        }
        Ok(log_prob)
    }

    fn support(&self) -> Option<Support> {
        self.base.support()
    }

    fn mean(&self) -> Result<Tensor> {
        self.base.mean()
    }

    fn variance(&self) -> Result<Tensor> {
        self.base.variance()
    }

    fn validate_args(&self) -> bool {
        self.base.validate_args()
    }

    fn set_validate_args(&mut self, validate: bool) {
        self.base.set_validate_args(validate);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Multidimensional uniform with the bound dimension as event dimension
#[derive(Debug)]
pub struct BoxUniform {
    low: ArrayD<f64>,
    high: ArrayD<f64>,
    inner: Independent,
}

impl BoxUniform {
    /// Box uniform over `low.shape()`; the last bound dimension becomes the event
    pub fn new(low: ArrayD<f64>, high: ArrayD<f64>) -> Result<Self> {
        Self::from_uniform(&Uniform::new(low, high)?)
    }

    pub fn from_bounds(low: &[f64], high: &[f64]) -> Result<Self> {
        Self::from_uniform(&Uniform::from_bounds(low, high)?)
    }

    /// Recast an elementwise uniform, keeping bounds, dtype and validation flag
    pub fn from_uniform(uniform: &Uniform) -> Result<Self> {
        if uniform.low().ndim() == 0 {
            return Err(SbiInputError::invalid_value(
                "BoxUniform requires bounds with at least one dimension",
            ));
        }
        Ok(Self {
            low: uniform.low().clone(),
            high: uniform.high().clone(),
            inner: Independent::new(Box::new(uniform.clone()), 1)?,
        })
    }

    #[must_use]
    pub fn with_dtype(self, dtype: DType) -> Self {
        let uniform = Uniform::new(self.low.clone(), self.high.clone())
            .map(|u| u.with_dtype(dtype))
            .and_then(|u| Independent::new(Box::new(u), 1));
        match uniform {
            Ok(inner) => Self { inner, ..self },
            Err(_) => self,
        }
    }

    #[must_use]
    pub fn low(&self) -> &ArrayD<f64> {
        &self.low
    }

    #[must_use]
    pub fn high(&self) -> &ArrayD<f64> {
        &self.high
    }
}

impl Distribution for BoxUniform {
    fn name(&self) -> &'static str {
        "BoxUniform"
    }

    fn batch_shape(&self) -> Vec<usize> {
        self.inner.batch_shape()
    }

    fn event_shape(&self) -> Vec<usize> {
        self.inner.event_shape()
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        self.inner.sample(sample_shape, rng)
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        self.inner.log_prob(value)
    }

    fn support(&self) -> Option<Support> {
        self.inner.support()
    }

    fn mean(&self) -> Result<Tensor> {
        self.inner.mean()
    }

    fn variance(&self) -> Result<Tensor> {
        self.inner.variance()
    }

    fn validate_args(&self) -> bool {
        self.inner.validate_args()
    }

    fn set_validate_args(&mut self, validate: bool) {
        self.inner.set_validate_args(validate);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
