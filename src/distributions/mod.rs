//! Distribution abstraction and the concrete priors used by the checks
//!
//! Shapes follow the batch/event convention: `sample(sample_shape)` returns
//! `sample_shape ++ batch_shape ++ event_shape`, and `log_prob(value)` returns
//! one entry per `sample_shape ++ batch_shape` position.

pub mod custom;
pub mod independent;
pub mod multiple_independent;
pub mod normal;
pub mod uniform;
pub mod wrappers;

pub use custom::{CustomPrior, CustomPriorWrapper, PriorCallError};
pub use independent::{BoxUniform, Independent};
pub use multiple_independent::MultipleIndependent;
pub use normal::Normal;
pub use uniform::Uniform;
pub use wrappers::{OneDimPriorWrapper, ReturnTypeWrapper};

use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Tensor};
use ndarray::{ArrayD, IxDyn};
use rand::RngCore;
use std::any::Any;
use std::fmt;

/// A distribution over parameter vectors
pub trait Distribution: Send + Sync + fmt::Debug {
    /// Short type name used in diagnostics
    fn name(&self) -> &'static str;

    /// Shape of independent, non-identical draws
    fn batch_shape(&self) -> Vec<usize>;

    /// Shape of a single draw
    fn event_shape(&self) -> Vec<usize>;

    /// Draw samples of shape `sample_shape ++ batch_shape ++ event_shape`
    ///
    /// # Errors
    /// - Sampling failures of the underlying distribution
    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor>;

    /// Log-density of `value`
    ///
    /// # Errors
    /// - `value` does not end with `batch_shape ++ event_shape`
    /// - `value` is outside the support while argument validation is enabled
    /// - The distribution cannot evaluate densities (`NotImplemented`)
    fn log_prob(&self, value: &Tensor) -> Result<Tensor>;

    /// Support of the distribution, `None` if unknown
    fn support(&self) -> Option<Support> {
        None
    }

    fn mean(&self) -> Result<Tensor> {
        Err(SbiInputError::not_implemented(format!(
            "{} does not implement mean",
            self.name()
        )))
    }

    fn variance(&self) -> Result<Tensor> {
        Err(SbiInputError::not_implemented(format!(
            "{} does not implement variance",
            self.name()
        )))
    }

    /// Whether `log_prob` rejects values outside the support
    fn validate_args(&self) -> bool;

    fn set_validate_args(&mut self, validate: bool);

    fn as_any(&self) -> &dyn Any;
}

/// Set of values a distribution assigns positive density to
#[derive(Debug, Clone, PartialEq)]
pub enum Support {
    /// All real numbers
    Real,
    /// Closed interval per event dimension; bounds broadcast cyclically
    Interval { low: Vec<f64>, high: Vec<f64> },
    /// Strictly greater than the bound
    GreaterThan(Vec<f64>),
    /// Strictly less than the bound
    LessThan(Vec<f64>),
    /// Concatenation of supports, each covering a number of event dimensions
    Product(Vec<(Support, usize)>),
}

impl Support {
    /// Whether one event (flattened) lies in the support
    #[must_use]
    pub fn contains(&self, event: &[f64]) -> bool {
        match self {
            Self::Real => event.iter().all(|v| !v.is_nan()),
            Self::Interval { low, high } => event.iter().enumerate().all(|(j, v)| {
                matches!((bound(low, j), bound(high, j)), (Some(l), Some(h)) if *v >= l && *v <= h)
            }),
            Self::GreaterThan(lower) => event
                .iter()
                .enumerate()
                .all(|(j, v)| bound(lower, j).is_some_and(|l| *v > l)),
            Self::LessThan(upper) => event
                .iter()
                .enumerate()
                .all(|(j, v)| bound(upper, j).is_some_and(|u| *v < u)),
            Self::Product(parts) => {
                let mut offset = 0;
                parts.iter().all(|(support, width)| {
                    let chunk = event.get(offset..offset + width);
                    offset += width;
                    chunk.is_some_and(|c| support.contains(c))
                })
            },
        }
    }

    /// One flag per event of `sample`, taking the last dimension as the event
    #[must_use]
    pub fn check(&self, sample: &Tensor) -> Vec<bool> {
        let width = sample.shape().last().copied().unwrap_or(1).max(1);
        sample
            .to_vec_f64()
            .chunks(width)
            .map(|event| self.contains(event))
            .collect()
    }
}

fn bound(bounds: &[f64], j: usize) -> Option<f64> {
    if bounds.is_empty() {
        return None;
    }
    bounds.get(j % bounds.len()).copied()
}

/// Per-event flags telling whether `sample` lies in the support of `distribution`
///
/// Uses the declared support when available, otherwise finiteness of
/// `log_prob`.
///
/// # Errors
/// - `NotImplemented` when the distribution has no support and cannot
///   evaluate `log_prob`
pub fn within_support(distribution: &dyn Distribution, sample: &Tensor) -> Result<Vec<bool>> {
    match distribution.support() {
        Some(support) => Ok(support.check(sample)),
        None => Ok(distribution.log_prob(sample)?.finite_mask()),
    }
}

pub(crate) fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

pub(crate) fn concat_shapes(a: &[usize], b: &[usize]) -> Vec<usize> {
    a.iter().chain(b).copied().collect()
}

/// Draw `numel(sample_shape)` independent rows of per-parameter values
pub(crate) fn sample_elementwise(
    sample_shape: &[usize],
    batch_shape: &[usize],
    dtype: DType,
    mut draw: impl FnMut(usize) -> f64,
) -> Result<Tensor> {
    let n_params = numel(batch_shape);
    let n_draws = numel(sample_shape);
    let mut values = Vec::with_capacity(n_draws * n_params);
    for _ in 0..n_draws {
        for j in 0..n_params {
            values.push(draw(j));
        }
    }
    let shape = concat_shapes(sample_shape, batch_shape);
    Ok(Tensor::from_f64(ArrayD::from_shape_vec(IxDyn(&shape), values)?).to_dtype(dtype))
}

/// Evaluate an elementwise log-density; `value` must end with `batch_shape`
pub(crate) fn log_prob_elementwise(
    name: &str,
    value: &Tensor,
    batch_shape: &[usize],
    dtype: DType,
    mut density: impl FnMut(f64, usize) -> Result<f64>,
) -> Result<Tensor> {
    let shape = value.shape();
    if !shape.ends_with(batch_shape) {
        return Err(SbiInputError::shape_mismatch(
            &format!("{}.log_prob", name),
            batch_shape,
            shape,
        ));
    }
    let n_params = numel(batch_shape).max(1);
    let log_probs = value
        .to_f64_array()
        .iter()
        .enumerate()
        .map(|(i, v)| density(*v, i % n_params))
        .collect::<Result<Vec<f64>>>()?;
    Ok(Tensor::from_f64(ArrayD::from_shape_vec(IxDyn(shape), log_probs)?).to_dtype(dtype))
}

pub(crate) fn out_of_support(name: &str, value: f64) -> SbiInputError {
    SbiInputError::invalid_value(format!(
        "Expected value argument to be within the support of {}, got {}",
        name, value
    ))
}
