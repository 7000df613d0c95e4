//! Observation normalization

use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Tensor, Value};
use tracing::trace;

const BATCHED_X_GUIDANCE: &str = "The `x` passed to condition the posterior for evaluation or \
sampling has an inferred batch shape larger than one. This is not supported in some methods, \
depending on the scenario:

    - to evaluate or sample conditioned on several iid xs, e.g. p(theta | [x1, x2, x3]), use a \
likelihood or ratio based method, or treat a fixed number of trials as an additional data \
dimension with an appropriate embedding net and pass x with a leading batch dimension.

    - to evaluate or sample conditioned on several xs one after the other, e.g. p(theta | x1), \
p(theta | x2), call the posterior once per x; broadcasting across xs is not supported.

    - if your observation is multidimensional, e.g. an image, pass it with a leading batch \
dimension, e.g. with shape (1, xdim1, xdim2).

For example, [[1]] and [[1, 2, 3]] are single observations with a leading batch dimension of \
one, while [[1], [2]] and [[1, 2, 3], [4, 5, 6]] are batches of two observations, which is not \
supported. [[[1, 2, 3], [4, 5, 6]]] is a single matrix-shaped observation. For convenience, [1] \
and [1, 2, 3] are single scalar and vector observations without a batch dimension.";

/// Normalizer for observed data
pub struct ObservationNormalizer;

impl ObservationNormalizer {
    /// Return `x` as a `float32` tensor with a leading batch dimension
    ///
    /// When `x_event_shape` (the shape of one simulation, without batch
    /// dimension) is known, a missing batch dimension is added and the
    /// trailing dimensions must match it. The leading dimension may be
    /// anything.
    ///
    /// # Errors
    /// - `InvalidValue` when the event shape has more dimensions than `x`
    /// - `Assertion` when the trailing dimensions differ from the event shape
    pub fn process_x(x: &Value, x_event_shape: Option<&[usize]>) -> Result<Tensor> {
        let mut x = x.to_tensor(DType::F32).atleast_2d();

        if let Some(event_shape) = x_event_shape {
            if event_shape.len() > x.ndim() {
                return Err(SbiInputError::invalid_value(format!(
                    "You passed an `x` of shape {:?} but the `x_event_shape` (inferred from \
                     simulations) is {:?}. We are raising this error because \
                     len(x_event_shape) > len(x.shape)",
                    x.shape(),
                    event_shape
                )));
            }
            if event_shape.len() == x.ndim() {
                x = x.unsqueeze(0)?;
            }
            if x.shape().get(1..) != Some(event_shape) {
                return Err(SbiInputError::assertion(format!(
                    "Observed data shape ({:?}) must match the shape of simulated data x ({:?}).",
                    x.shape().get(1..).unwrap_or_default(),
                    event_shape
                )));
            }
        }

        trace!(shape = ?x.shape(), "Processed observation");
        Ok(x)
    }

    /// Reject multidimensional shapes whose leading dimension exceeds one
    ///
    /// # Errors
    /// - `InvalidValue` with guidance on passing multiple observations
    pub fn check_for_possibly_batched_x_shape(x_shape: &[usize]) -> Result<()> {
        match x_shape {
            [batch, _, ..] if *batch > 1 => Err(SbiInputError::invalid_value(BATCHED_X_GUIDANCE)),
            _ => Ok(()),
        }
    }
}
