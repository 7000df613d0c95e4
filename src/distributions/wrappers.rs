//! Corrective wrappers applied while processing a prior

use super::{Distribution, Support};
use crate::error::Result;
use crate::tensor::{DType, Tensor};
use rand::RngCore;
use std::any::Any;

/// Casts samples and log-densities of the wrapped prior to `return_type`
#[derive(Debug)]
pub struct ReturnTypeWrapper {
    prior: Box<dyn Distribution>,
    return_type: DType,
}

impl ReturnTypeWrapper {
    #[must_use]
    pub fn new(mut prior: Box<dyn Distribution>, return_type: DType) -> Self {
        prior.set_validate_args(false);
        Self { prior, return_type }
    }

    #[must_use]
    pub fn inner(&self) -> &dyn Distribution {
        self.prior.as_ref()
    }

    #[must_use]
    pub fn return_type(&self) -> DType {
        self.return_type
    }
}

impl Distribution for ReturnTypeWrapper {
    fn name(&self) -> &'static str {
        "ReturnTypeWrapper"
    }

    fn batch_shape(&self) -> Vec<usize> {
        self.prior.batch_shape()
    }

    fn event_shape(&self) -> Vec<usize> {
        self.prior.event_shape()
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        Ok(self.prior.sample(sample_shape, rng)?.to_dtype(self.return_type))
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        Ok(self.prior.log_prob(value)?.to_dtype(self.return_type))
    }

    fn support(&self) -> Option<Support> {
        self.prior.support()
    }

    fn mean(&self) -> Result<Tensor> {
        Ok(self.prior.mean()?.to_dtype(self.return_type))
    }

    fn variance(&self) -> Result<Tensor> {
        Ok(self.prior.variance()?.to_dtype(self.return_type))
    }

    fn validate_args(&self) -> bool {
        self.prior.validate_args()
    }

    fn set_validate_args(&mut self, validate: bool) {
        self.prior.set_validate_args(validate);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Drops the trailing singleton dimension that one-dimensional priors leave on
/// `log_prob`, so a batch of `n` samples yields `n` log-densities
#[derive(Debug)]
pub struct OneDimPriorWrapper {
    prior: Box<dyn Distribution>,
}

impl OneDimPriorWrapper {
    #[must_use]
    pub fn new(mut prior: Box<dyn Distribution>) -> Self {
        prior.set_validate_args(false);
        Self { prior }
    }

    #[must_use]
    pub fn inner(&self) -> &dyn Distribution {
        self.prior.as_ref()
    }
}

impl Distribution for OneDimPriorWrapper {
    fn name(&self) -> &'static str {
        "OneDimPriorWrapper"
    }

    fn batch_shape(&self) -> Vec<usize> {
        self.prior.batch_shape()
    }

    fn event_shape(&self) -> Vec<usize> {
        self.prior.event_shape()
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        self.prior.sample(sample_shape, rng)
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        Ok(self.prior.log_prob(value)?.squeeze_last())
    }

    fn support(&self) -> Option<Support> {
        self.prior.support()
    }

    fn mean(&self) -> Result<Tensor> {
        self.prior.mean()
    }

    fn variance(&self) -> Result<Tensor> {
        self.prior.variance()
    }

    fn validate_args(&self) -> bool {
        self.prior.validate_args()
    }

    fn set_validate_args(&mut self, validate: bool) {
        self.prior.set_validate_args(validate);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::Normal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_return_type_wrapper_casts() {
        let mut rng = StdRng::seed_from_u64(0);
        let prior = Normal::from_params(&[0.0], &[1.0]).unwrap().with_dtype(DType::F64);
        let wrapped = ReturnTypeWrapper::new(Box::new(prior), DType::F32);
        let samples = wrapped.sample(&[4], &mut rng).unwrap();
        assert_eq!(samples.dtype(), DType::F32);
        assert_eq!(wrapped.log_prob(&samples).unwrap().dtype(), DType::F32);
        assert!(!wrapped.validate_args());
    }

    #[test]
    fn test_one_dim_wrapper_squeezes() {
        let mut rng = StdRng::seed_from_u64(1);
        let wrapped = OneDimPriorWrapper::new(Box::new(Normal::from_params(&[0.0], &[1.0]).unwrap()));
        let samples = wrapped.sample(&[10], &mut rng).unwrap();
        assert_eq!(samples.shape(), &[10, 1]);
        assert_eq!(wrapped.log_prob(&samples).unwrap().shape(), &[10]);
    }
}
