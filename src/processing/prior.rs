//! Prior processing: dispatch, corrective wrapping and batch-shape checks

use crate::config::CustomPriorOptions;
use crate::distributions::{
    BoxUniform, CustomPrior, CustomPriorWrapper, Distribution, MultipleIndependent,
    OneDimPriorWrapper, ReturnTypeWrapper, Uniform,
};
use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Value};
use crate::types::{InputWarning, PriorInput, ProcessedPrior};
use crate::utils::validation::PriorValidator;
use rand::RngCore;
use tracing::{debug, instrument};

/// Samples drawn to detect a trailing singleton dimension on `log_prob`
const LOG_PROB_PROBE_SIZE: usize = 10;

const BATCH_DIMS_GUIDANCE: &str = "The specified prior has `batch_shape` larger than 1. Please \
specify a prior with batch_shape smaller equal to 1 and `event_shape` equal to number of \
parameters of your model.

In case your intention was to pass a univariate distribution like Uniform (or Beta, Gamma, \
etc.) defined over multiple parameters, consider instead using `Independent` to reinterpret \
batch dimensions as event dimensions, or use the `MultipleIndependent` distribution.

To use `MultipleIndependent`, pass a sequence of priors, e.g. to specify a uniform prior over \
two parameters:
    PriorInput::Sequence(vec![
        PriorInput::distribution(Uniform::from_bounds(&[0.0], &[1.0])?),
        PriorInput::distribution(Uniform::from_bounds(&[1.0], &[2.0])?),
    ])
or, for a normal over the first parameter and a box uniform over the other two:
    PriorInput::Sequence(vec![
        PriorInput::distribution(Normal::from_params(&[0.0], &[1.0])?),
        PriorInput::distribution(BoxUniform::from_bounds(&[0.0, 0.0], &[1.0, 1.0])?),
    ])";

/// Processor turning user priors into `float32` distributions with batch
/// multiplicity of at most one
pub struct PriorProcessor;

impl PriorProcessor {
    /// Process a user prior with default custom-prior options
    ///
    /// # Errors
    /// See [`Self::process_prior_with`].
    pub fn process_prior(prior: PriorInput, rng: &mut dyn RngCore) -> Result<ProcessedPrior> {
        Self::process_prior_with(prior, &CustomPriorOptions::default(), rng)
    }

    /// Process a user prior
    ///
    /// Sequences are processed element by element and combined into a
    /// [`MultipleIndependent`]; `options` apply to every custom prior, nested
    /// ones included.
    ///
    /// # Errors
    /// - `NotImplemented` for legacy stats-library objects
    /// - `InvalidValue` for scalar priors and batch shapes with more than one element
    /// - `MissingMethod`, `CallingConvention` or `InvalidValue` for custom priors
    ///   that cannot sample or evaluate a batch
    /// - `Assertion` when batch behavior or return type is wrong after wrapping
    #[instrument(skip_all, fields(kind = prior.kind()))]
    pub fn process_prior_with(
        prior: PriorInput,
        options: &CustomPriorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<ProcessedPrior> {
        match prior {
            PriorInput::Sequence(items) => {
                let mut warnings = vec![InputWarning::IndependentSequence { count: items.len() }.emit()];
                let mut components = Vec::with_capacity(items.len());
                for item in items {
                    let processed = Self::process_prior_with(item, options, rng)?;
                    warnings.extend(processed.warnings);
                    components.push(processed.prior);
                }
                let joint = MultipleIndependent::new(components)?;
                let mut processed = Self::process_distribution_prior(Box::new(joint), rng)?;
                warnings.append(&mut processed.warnings);
                processed.warnings = warnings;
                Ok(processed)
            },
            PriorInput::Legacy(legacy) => Err(SbiInputError::not_implemented(format!(
                "Passing a prior as scipy.stats object (`{}`) is deprecated. Please pass it as \
                 a Distribution.",
                legacy.name
            ))),
            PriorInput::Distribution(dist) => Self::process_distribution_prior(dist, rng),
            PriorInput::Custom(custom) => Self::process_custom_prior(custom, options, rng),
        }
    }

    /// Normalize a distribution prior
    ///
    /// # Errors
    /// - `InvalidValue` when a single sample is a scalar or the batch shape has
    ///   more than one element
    /// - `Assertion` when the prior fails the batch or return-type checks
    pub fn process_distribution_prior(
        mut prior: Box<dyn Distribution>,
        rng: &mut dyn RngCore,
    ) -> Result<ProcessedPrior> {
        let mut warnings = Vec::new();

        // Out-of-support log_prob queries must not fail later on
        prior.set_validate_args(false);

        if prior.sample(&[], rng)?.ndim() == 0 {
            return Err(SbiInputError::invalid_value(
                "Detected scalar prior. Please make sure to pass a prior with `batch_shape = [1]` \
                 or `event_shape = [1]`.",
            ));
        }
        let recast = match prior.as_any().downcast_ref::<Uniform>() {
            Some(uniform) if numel(&uniform.batch_shape()) == 1 => {
                Some(BoxUniform::from_uniform(uniform)?)
            },
            _ => None,
        };
        if let Some(box_uniform) = recast {
            prior = Box::new(box_uniform);
            warnings.push(InputWarning::UniformRecast.emit());
        }

        PriorValidator::check_prior_batch_behavior(prior.as_ref(), rng)?;
        Self::check_prior_batch_dims(prior.as_ref())?;

        let dtype = prior.sample(&[], rng)?.dtype();
        if dtype != DType::F32 {
            debug!(%dtype, "Wrapping prior to return float32");
            prior = Box::new(ReturnTypeWrapper::new(prior, DType::F32));
        }
        PriorValidator::check_prior_return_type(prior.as_ref(), DType::F32, rng)?;

        let probe = prior.sample(&[LOG_PROB_PROBE_SIZE], rng)?;
        if prior.log_prob(&probe)?.shape() == [LOG_PROB_PROBE_SIZE, 1] {
            debug!("Wrapping prior to squeeze the trailing log_prob dimension");
            prior = Box::new(OneDimPriorWrapper::new(prior));
        }

        let theta_numel = prior.sample(&[], rng)?.numel();
        debug!(prior = prior.name(), theta_numel, "Processed distribution prior");
        Ok(ProcessedPrior {
            prior,
            theta_numel,
            prior_returns_ndarray: false,
            warnings,
        })
    }

    /// Check and wrap a custom prior
    ///
    /// # Errors
    /// - Invalid `options`
    /// - `MissingMethod`, `CallingConvention` or `InvalidValue` from the
    ///   attribute check
    /// - `CallingConvention` when the prior returns neither tensors nor arrays
    /// - `Assertion` when batch behavior or return type is wrong
    pub fn process_custom_prior(
        prior: Box<dyn CustomPrior>,
        options: &CustomPriorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<ProcessedPrior> {
        options.validate()?;
        PriorValidator::check_prior_attributes(prior.as_ref(), rng)?;
        PriorValidator::check_custom_prior_batch_behavior(prior.as_ref(), rng)?;

        let wrapped = Self::maybe_wrap_prior(prior, options, rng)?;
        let mut warnings = Vec::new();
        if wrapped.estimated_moments() {
            warnings.push(
                InputWarning::MomentsEstimated {
                    num_samples: options.moment_samples,
                }
                .emit(),
            );
        }
        PriorValidator::check_prior_return_type(&wrapped, DType::F32, rng)?;

        let theta_numel = wrapped.sample(&[], rng)?.numel();
        let prior_returns_ndarray = wrapped.returns_ndarray();
        Ok(ProcessedPrior {
            prior: Box::new(wrapped),
            theta_numel,
            prior_returns_ndarray,
            warnings,
        })
    }

    /// Wrap a custom prior returning tensors or host arrays as a distribution
    ///
    /// The event shape is the element count of one sample.
    ///
    /// # Errors
    /// - `CallingConvention` for any other return type
    pub fn maybe_wrap_prior(
        prior: Box<dyn CustomPrior>,
        options: &CustomPriorOptions,
        rng: &mut dyn RngCore,
    ) -> Result<CustomPriorWrapper> {
        let theta = prior.sample(&[1], rng)?;
        let log_probs = prior.log_prob(&theta)?;
        let returns_ndarray = match (&theta, &log_probs) {
            (Value::Tensor(_), Value::Tensor(_)) => false,
            (Value::NdArray(_), Value::NdArray(_)) => true,
            _ => {
                return Err(SbiInputError::calling_convention(format!(
                    "Prior must return Tensor or ndarray, but returns {} (log_prob returns {})",
                    theta.type_name(),
                    log_probs.type_name()
                )))
            },
        };
        CustomPriorWrapper::new(prior, vec![theta.numel()], returns_ndarray, options, rng)
    }

    /// Reject priors whose batch shape has more than one element
    ///
    /// # Errors
    /// - `InvalidValue` with remediation guidance
    pub fn check_prior_batch_dims(prior: &dyn Distribution) -> Result<()> {
        if numel(&prior.batch_shape()) > 1 {
            return Err(SbiInputError::invalid_value(BATCH_DIMS_GUIDANCE));
        }
        Ok(())
    }
}

fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}
