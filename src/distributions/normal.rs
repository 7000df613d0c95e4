//! Elementwise normal distribution

use super::{log_prob_elementwise, sample_elementwise, Distribution, Support};
use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Tensor};
use ndarray::{Array1, ArrayD, Zip};
use rand::RngCore;
use rand_distr::{Distribution as _, StandardNormal};
use std::any::Any;

/// Natural log of `sqrt(2π)`.
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Normal distribution `N(loc, scale)`, one independent component per entry
#[derive(Debug, Clone)]
pub struct Normal {
    loc: ArrayD<f64>,
    scale: ArrayD<f64>,
    dtype: DType,
    validate_args: bool,
}

impl Normal {
    pub fn new(loc: ArrayD<f64>, scale: ArrayD<f64>) -> Result<Self> {
        if loc.shape() != scale.shape() {
            return Err(SbiInputError::invalid_value(format!(
                "Normal loc and scale must have the same shape, got {:?} and {:?}",
                loc.shape(),
                scale.shape()
            )));
        }
        if !Zip::from(&scale).all(|s| s.is_finite() && *s > 0.0) {
            return Err(SbiInputError::invalid_value(
                "Normal scale must be finite and > 0 for every component",
            ));
        }
        Ok(Self {
            loc,
            scale,
            dtype: DType::F32,
            validate_args: true,
        })
    }

    /// Normal with batch shape `[loc.len()]`
    pub fn from_params(loc: &[f64], scale: &[f64]) -> Result<Self> {
        Self::new(
            Array1::from(loc.to_vec()).into_dyn(),
            Array1::from(scale.to_vec()).into_dyn(),
        )
    }

    #[must_use]
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    #[must_use]
    pub fn loc(&self) -> &ArrayD<f64> {
        &self.loc
    }

    #[must_use]
    pub fn scale(&self) -> &ArrayD<f64> {
        &self.scale
    }
}

impl Distribution for Normal {
    fn name(&self) -> &'static str {
        "Normal"
    }

    fn batch_shape(&self) -> Vec<usize> {
        self.loc.shape().to_vec()
    }

    fn event_shape(&self) -> Vec<usize> {
        Vec::new()
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        let loc: Vec<f64> = self.loc.iter().copied().collect();
        let scale: Vec<f64> = self.scale.iter().copied().collect();
        sample_elementwise(sample_shape, self.loc.shape(), self.dtype, |j| {
            let z: f64 = StandardNormal.sample(&mut *rng);
            loc.get(j).copied().unwrap_or(0.0) + scale.get(j).copied().unwrap_or(1.0) * z
        })
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        let loc: Vec<f64> = self.loc.iter().copied().collect();
        let scale: Vec<f64> = self.scale.iter().copied().collect();
        log_prob_elementwise(self.name(), value, self.loc.shape(), self.dtype, |x, j| {
            let mu = loc.get(j).copied().unwrap_or(0.0);
            let sigma = scale.get(j).copied().unwrap_or(1.0);
            let z = (x - mu) / sigma;
            Ok(-0.5 * z * z - sigma.ln() - LN_SQRT_2PI)
        })
    }

    fn support(&self) -> Option<Support> {
        Some(Support::Real)
    }

    fn mean(&self) -> Result<Tensor> {
        Ok(Tensor::from_f64(self.loc.clone()).to_dtype(self.dtype))
    }

    fn variance(&self) -> Result<Tensor> {
        Ok(Tensor::from_f64(self.scale.mapv(|s| s * s)).to_dtype(self.dtype))
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
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_at_zero() {
        let normal = Normal::from_params(&[0.0], &[1.0]).unwrap();
        let lp = normal.log_prob(&Tensor::from_shape_vec(&[1], vec![0.0]).unwrap()).unwrap();
        assert_relative_eq!(lp.to_vec_f64()[0], -LN_SQRT_2PI, epsilon = 1e-6);
    }

    #[test]
    fn test_one_dim_log_prob_keeps_trailing_dim() {
        let mut rng = StdRng::seed_from_u64(3);
        let normal = Normal::from_params(&[0.0], &[1.0]).unwrap();
        let samples = normal.sample(&[10], &mut rng).unwrap();
        assert_eq!(samples.shape(), &[10, 1]);
        assert_eq!(normal.log_prob(&samples).unwrap().shape(), &[10, 1]);
    }

    #[test]
    fn test_dtype_follows_configuration() {
        let mut rng = StdRng::seed_from_u64(4);
        let normal = Normal::from_params(&[0.0], &[1.0]).unwrap().with_dtype(DType::F64);
        assert_eq!(normal.sample(&[2], &mut rng).unwrap().dtype(), DType::F64);
    }

    #[test]
    fn test_invalid_scale() {
        assert!(Normal::from_params(&[0.0], &[0.0]).is_err());
        assert!(Normal::from_params(&[0.0], &[-1.0]).is_err());
        assert!(Normal::from_params(&[0.0, 1.0], &[1.0]).is_err());
    }
}
