//! Joint distribution of independent components matched by position

use super::{concat_shapes, numel, Distribution, Support};
use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Tensor};
use ndarray::Array1;
use rand::RngCore;
use std::any::Any;

/// Product of independent priors; the event is the concatenation of the
/// component events, in order.
#[derive(Debug)]
pub struct MultipleIndependent {
    dists: Vec<Box<dyn Distribution>>,
    dims_per_dist: Vec<usize>,
}

impl MultipleIndependent {
    /// Combine components, each with batch multiplicity ≤ 1 and at least one
    /// non-batch dimension
    pub fn new(dists: Vec<Box<dyn Distribution>>) -> Result<Self> {
        if dists.is_empty() {
            return Err(SbiInputError::invalid_value(
                "MultipleIndependent needs at least one distribution",
            ));
        }
        let mut dims_per_dist = Vec::with_capacity(dists.len());
        for (i, dist) in dists.iter().enumerate() {
            let batch_shape = dist.batch_shape();
            let event_shape = dist.event_shape();
            if numel(&batch_shape) > 1 {
                return Err(SbiInputError::invalid_value(format!(
                    "The batch shape of every distribution passed to MultipleIndependent \
                     must be empty or [1], but distribution {} ({}) has batch shape {:?}. \
                     Wrap it in Independent to move batch dimensions into the event.",
                    i,
                    dist.name(),
                    batch_shape
                )));
            }
            if batch_shape.is_empty() && event_shape.is_empty() {
                return Err(SbiInputError::invalid_value(format!(
                    "Distribution {} ({}) passed to MultipleIndependent is scalar. Use a \
                     distribution with batch shape [1] or event shape [1], e.g. BoxUniform.",
                    i,
                    dist.name()
                )));
            }
            dims_per_dist.push(numel(&batch_shape) * numel(&event_shape));
        }
        Ok(Self {
            dists,
            dims_per_dist,
        })
    }

    /// Total number of parameters
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.dims_per_dist.iter().sum()
    }

    #[must_use]
    pub fn dims_per_dist(&self) -> &[usize] {
        &self.dims_per_dist
    }

    #[must_use]
    pub fn components(&self) -> &[Box<dyn Distribution>] {
        &self.dists
    }

    fn native_shape(dist: &dyn Distribution, n: usize) -> Vec<usize> {
        concat_shapes(&concat_shapes(&[n], &dist.batch_shape()), &dist.event_shape())
    }

    fn concat_moments(&self, moment: impl Fn(&dyn Distribution) -> Result<Tensor>) -> Result<Tensor> {
        let parts = self
            .dists
            .iter()
            .zip(&self.dims_per_dist)
            .map(|(dist, dims)| moment(dist.as_ref())?.reshape(&[*dims]))
            .collect::<Result<Vec<_>>>()?;
        Tensor::concat(&parts, 0)
    }
}

impl Distribution for MultipleIndependent {
    fn name(&self) -> &'static str {
        "MultipleIndependent"
    }

    fn batch_shape(&self) -> Vec<usize> {
        Vec::new()
    }

    fn event_shape(&self) -> Vec<usize> {
        vec![self.ndims()]
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<Tensor> {
        let n = numel(sample_shape);
        let parts = self
            .dists
            .iter()
            .zip(&self.dims_per_dist)
            .map(|(dist, dims)| dist.sample(sample_shape, &mut *rng)?.reshape(&[n, *dims]))
            .collect::<Result<Vec<_>>>()?;
        let joint = Tensor::concat(&parts, 1)?;
        joint.reshape(&concat_shapes(sample_shape, &[self.ndims()]))
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        let ndims = self.ndims();
        let shape = value.shape();
        let leading = match shape.split_last() {
            Some((last, leading)) if *last == ndims => leading,
            _ => {
                return Err(SbiInputError::shape_mismatch(
                    "MultipleIndependent.log_prob",
                    &[ndims],
                    shape,
                ))
            },
        };
        let n = numel(leading);
        let flat = value.reshape(&[n, ndims])?;

        let mut total = vec![0.0; n];
        let mut dtype = DType::F32;
        let mut offset = 0;
        for (i, (dist, dims)) in self.dists.iter().zip(&self.dims_per_dist).enumerate() {
            let part = flat
                .narrow(1, offset, *dims)?
                .reshape(&Self::native_shape(dist.as_ref(), n))?;
            let log_prob = dist.log_prob(&part)?;
            if i == 0 {
                dtype = log_prob.dtype();
            }
            for (acc, lp) in total.iter_mut().zip(log_prob.reshape(&[n])?.to_vec_f64()) {
                *acc += lp;
            }
            offset += dims;
        }
        let joint = Tensor::from_f64(Array1::from(total).into_dyn()).reshape(leading)?;
        Ok(joint.to_dtype(dtype))
    }

    fn support(&self) -> Option<Support> {
        let parts = self
            .dists
            .iter()
            .zip(&self.dims_per_dist)
            .map(|(dist, dims)| dist.support().map(|s| (s, *dims)))
            .collect::<Option<Vec<_>>>()?;
        Some(Support::Product(parts))
    }

    fn mean(&self) -> Result<Tensor> {
        self.concat_moments(|d| d.mean())
    }

    fn variance(&self) -> Result<Tensor> {
        self.concat_moments(|d| d.variance())
    }

    fn validate_args(&self) -> bool {
        self.dists.iter().any(|d| d.validate_args())
    }

    fn set_validate_args(&mut self, validate: bool) {
        for dist in &mut self.dists {
            dist.set_validate_args(validate);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
