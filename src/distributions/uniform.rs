//! Elementwise uniform distribution

use super::{log_prob_elementwise, out_of_support, sample_elementwise, Distribution, Support};
use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Tensor};
use ndarray::{Array1, ArrayD, IxDyn, Zip};
use rand::{Rng, RngCore};
use std::any::Any;

/// Uniform distribution on `[low, high]`, one independent component per entry
///
/// The shape of the bounds is the batch shape; the event shape is empty.
#[derive(Debug, Clone)]
pub struct Uniform {
    low: ArrayD<f64>,
    high: ArrayD<f64>,
    dtype: DType,
    validate_args: bool,
}

impl Uniform {
    /// Create a uniform distribution from bound arrays of equal shape
    pub fn new(low: ArrayD<f64>, high: ArrayD<f64>) -> Result<Self> {
        if low.shape() != high.shape() {
            return Err(SbiInputError::invalid_value(format!(
                "Uniform bounds must have the same shape, got {:?} and {:?}",
                low.shape(),
                high.shape()
            )));
        }
        let ordered = Zip::from(&low).and(&high).all(|l, h| l < h);
        if !ordered {
            return Err(SbiInputError::invalid_value(
                "Uniform requires low < high for every component",
            ));
        }
        Ok(Self {
            low,
            high,
            dtype: DType::F32,
            validate_args: true,
        })
    }

    /// Uniform with batch shape `[low.len()]`
    pub fn from_bounds(low: &[f64], high: &[f64]) -> Result<Self> {
        Self::new(
            Array1::from(low.to_vec()).into_dyn(),
            Array1::from(high.to_vec()).into_dyn(),
        )
    }

    /// Uniform over an unwrapped scalar (empty batch shape)
    pub fn scalar(low: f64, high: f64) -> Result<Self> {
        Self::new(
            ArrayD::from_elem(IxDyn(&[]), low),
            ArrayD::from_elem(IxDyn(&[]), high),
        )
    }

    #[must_use]
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    #[must_use]
    pub fn low(&self) -> &ArrayD<f64> {
        &self.low
    }

    #[must_use]
    pub fn high(&self) -> &ArrayD<f64> {
        &self.high
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    fn flat(array: &ArrayD<f64>) -> Vec<f64> {
        array.iter().copied().collect()
    }
}

impl Distribution for Uniform {
    fn name(&self) -> &'static str {
        "Uniform"
    }

    fn batch_shape(&self) -> Vec<usize> {
        self.low.shape().to_vec()
    }

    fn event_shape(&self) -> Vec<usize> {
        Vec::new()
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        let low = Self::flat(&self.low);
        let high = Self::flat(&self.high);
        sample_elementwise(sample_shape, self.low.shape(), self.dtype, |j| {
            let (l, h) = (low.get(j).copied().unwrap_or(0.0), high.get(j).copied().unwrap_or(1.0));
            l + (h - l) * rng.random::<f64>()
        })
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        let low = Self::flat(&self.low);
        let high = Self::flat(&self.high);
        let validate = self.validate_args;
        log_prob_elementwise(self.name(), value, self.low.shape(), self.dtype, |v, j| {
            let (l, h) = (low.get(j).copied().unwrap_or(0.0), high.get(j).copied().unwrap_or(1.0));
            if v >= l && v <= h {
                Ok(-(h - l).ln())
            } else if validate {
                Err(out_of_support("Uniform", v))
            } else {
                Ok(f64::NEG_INFINITY)
            }
        })
    }

    fn support(&self) -> Option<Support> {
        Some(Support::Interval {
            low: Self::flat(&self.low),
            high: Self::flat(&self.high),
        })
    }

    fn mean(&self) -> Result<Tensor> {
        let mean = (&self.low + &self.high) / 2.0;
        Ok(Tensor::from_f64(mean).to_dtype(self.dtype))
    }

    fn variance(&self) -> Result<Tensor> {
        let width = &self.high - &self.low;
        Ok(Tensor::from_f64(width.mapv(|w| w * w / 12.0)).to_dtype(self.dtype))
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
