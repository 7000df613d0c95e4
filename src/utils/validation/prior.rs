//! Prior validation utilities
//!
//! Assertions on the attributes, batch behavior, return type and support of
//! priors, run before and after the corrective wrapping in
//! [`PriorProcessor`](crate::processing::PriorProcessor).

use crate::distributions::{within_support, CustomPrior, Distribution, PriorCallError};
use crate::error::{Result, SbiInputError};
use crate::tensor::DType;
use crate::types::PriorInput;
use rand::RngCore;

/// Parameter count sampled when probing batch behavior
const BATCH_PROBE_SIZE: usize = 1;

/// Parameter count sampled when probing the calling convention
const ATTRIBUTE_PROBE_SIZE: usize = 2;

/// Validator for user priors
pub struct PriorValidator;

impl PriorValidator {
    /// Pass for no prior or a distribution, fail for anything else
    pub fn check_prior(prior: Option<&PriorInput>) -> Result<()> {
        match prior {
            None | Some(PriorInput::Distribution(_)) => Ok(()),
            Some(other) => Err(SbiInputError::assertion(format!(
                "Prior must be a Distribution, got a {}. Use `process_prior` for wrapping \
                 custom priors and sequences of independent priors.",
                other.kind()
            ))),
        }
    }

    /// Sampling one parameter vector yields a batch of one and one log-density
    pub fn check_prior_batch_behavior(prior: &dyn Distribution, rng: &mut dyn RngCore) -> Result<()> {
        let theta = prior.sample(&[BATCH_PROBE_SIZE], rng)?;
        let log_probs = prior.log_prob(&theta)?;
        Self::check_batch_counts(theta.shape(), log_probs.shape().first().copied())
    }

    /// Like [`Self::check_prior_batch_behavior`] for a custom prior
    pub fn check_custom_prior_batch_behavior(
        prior: &dyn CustomPrior,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let theta = prior.sample(&[BATCH_PROBE_SIZE], rng)?;
        let log_probs = prior.log_prob(&theta)?;
        Self::check_batch_counts(&theta.shape(), log_probs.leading_dim())
    }

    fn check_batch_counts(theta_shape: &[usize], num_log_probs: Option<usize>) -> Result<()> {
        log::debug!(
            "Batch probe: theta shape {:?}, {:?} log probs",
            theta_shape,
            num_log_probs
        );
        if theta_shape.len() < 2 {
            return Err(SbiInputError::assertion(format!(
                "A parameter batch sampled from the prior must be at least 2D, \
                 (num_samples, parameter_dim), but is {}",
                theta_shape.len()
            )));
        }
        if theta_shape.first().copied() != Some(BATCH_PROBE_SIZE) {
            return Err(SbiInputError::assertion(
                "prior.sample((batch_size, )) must return batch_size parameters.",
            ));
        }
        if num_log_probs != Some(BATCH_PROBE_SIZE) {
            return Err(SbiInputError::assertion(
                "prior.log_prob must return as many log probs as samples.",
            ));
        }
        Ok(())
    }

    /// The prior samples `return_type` (callers pass `float32`)
    pub fn check_prior_return_type(
        prior: &dyn Distribution,
        return_type: DType,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let dtype = prior.sample(&[], rng)?.dtype();
        if dtype != return_type {
            return Err(SbiInputError::expectation_error(
                "Prior return type",
                return_type,
                dtype,
            ));
        }
        Ok(())
    }

    /// The prior declares a support or evaluates `log_prob` outside of it
    pub fn check_prior_support(prior: &dyn Distribution, rng: &mut dyn RngCore) -> Result<()> {
        let theta = prior.sample(&[1], rng)?;
        match within_support(prior, &theta) {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_implemented() => {
                log::debug!("Support check of {} failed: {}", prior.name(), err);
                Err(SbiInputError::not_implemented(
                    "The prior must implement the support property or allow to call \
                     .log_prob() outside of support.",
                ))
            },
            Err(err) => Err(err),
        }
    }

    /// The custom prior samples a batch of parameters and evaluates them
    pub fn check_prior_attributes(prior: &dyn CustomPrior, rng: &mut dyn RngCore) -> Result<()> {
        let theta = prior.sample(&[ATTRIBUTE_PROBE_SIZE], rng).map_err(|err| match err {
            PriorCallError::Missing(_) => SbiInputError::missing_method(
                "Prior needs method `.sample()`. Consider using a Distribution.",
            ),
            PriorCallError::Signature(detail) => SbiInputError::calling_convention(format!(
                "The `prior.sample()` method must accept a sample shape, e.g. \
                 prior.sample(&[{n}]) to sample a batch of {n} parameters. Consider using \
                 a Distribution. ({detail})",
                n = ATTRIBUTE_PROBE_SIZE,
                detail = detail
            )),
            PriorCallError::Failed(source) => SbiInputError::invalid_value(format!(
                "Something went wrong when sampling a batch of parameters from the prior as \
                 `prior.sample(&[{}])`. Consider using a Distribution. ({:#})",
                ATTRIBUTE_PROBE_SIZE, source
            )),
        })?;

        prior.log_prob(&theta).map_err(|err| {
            let detail = match err {
                PriorCallError::Missing(_) => {
                    return SbiInputError::missing_method(
                        "Prior needs method `.log_prob()`. Consider using a Distribution.",
                    )
                },
                PriorCallError::Signature(detail) => detail,
                PriorCallError::Failed(source) => format!("{:#}", source),
            };
            SbiInputError::invalid_value(format!(
                "Something went wrong when evaluating a batch of parameters theta with \
                 `prior.log_prob(theta)`. Consider using a Distribution. ({})",
                detail
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{BoxUniform, Uniform};
    use crate::tensor::{Tensor, Value};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct NoSample;
    impl CustomPrior for NoSample {}

    struct UnbatchedSample;
    impl CustomPrior for UnbatchedSample {
        fn sample(
            &self,
            sample_shape: &[usize],
            _rng: &mut dyn RngCore,
        ) -> std::result::Result<Value, PriorCallError> {
            if sample_shape.is_empty() {
                Ok(Value::Sequence(vec![0.0, 0.0]))
            } else {
                Err(PriorCallError::Signature("sample takes no arguments".into()))
            }
        }
    }

    struct BrokenLogProb;
    impl CustomPrior for BrokenLogProb {
        fn sample(
            &self,
            sample_shape: &[usize],
            _rng: &mut dyn RngCore,
        ) -> std::result::Result<Value, PriorCallError> {
            let mut shape = sample_shape.to_vec();
            shape.push(2);
            Ok(Value::Tensor(Tensor::zeros(&shape, DType::F32)))
        }

        fn log_prob(&self, _theta: &Value) -> std::result::Result<Value, PriorCallError> {
            Err(anyhow::anyhow!("density diverged").into())
        }
    }

    #[test]
    fn test_check_prior() {
        assert!(PriorValidator::check_prior(None).is_ok());
        let dist = PriorInput::distribution(BoxUniform::from_bounds(&[0.0], &[1.0]).unwrap());
        assert!(PriorValidator::check_prior(Some(&dist)).is_ok());
        let custom = PriorInput::custom(NoSample);
        assert!(matches!(
            PriorValidator::check_prior(Some(&custom)),
            Err(SbiInputError::Assertion(_))
        ));
    }

    #[test]
    fn test_attribute_failures_are_classified() {
        let mut rng = StdRng::seed_from_u64(0);

        let err = PriorValidator::check_prior_attributes(&NoSample, &mut rng).unwrap_err();
        assert!(matches!(err, SbiInputError::MissingMethod(_)));

        let err = PriorValidator::check_prior_attributes(&UnbatchedSample, &mut rng).unwrap_err();
        assert!(matches!(err, SbiInputError::CallingConvention(_)));
        assert!(err.to_string().contains("sample(&[2])"));

        let err = PriorValidator::check_prior_attributes(&BrokenLogProb, &mut rng).unwrap_err();
        assert!(matches!(err, SbiInputError::InvalidValue(_)));
        assert!(err.to_string().contains("density diverged"));
    }

    #[test]
    fn test_batch_behavior_rejects_scalar_batches() {
        let mut rng = StdRng::seed_from_u64(1);
        let scalar = Uniform::scalar(0.0, 1.0).unwrap();
        let err = PriorValidator::check_prior_batch_behavior(&scalar, &mut rng).unwrap_err();
        assert!(matches!(err, SbiInputError::Assertion(_)));

        let boxed = BoxUniform::from_bounds(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert!(PriorValidator::check_prior_batch_behavior(&boxed, &mut rng).is_ok());
    }

    #[test]
    fn test_return_type() {
        let mut rng = StdRng::seed_from_u64(2);
        let prior = BoxUniform::from_bounds(&[0.0], &[1.0]).unwrap();
        assert!(PriorValidator::check_prior_return_type(&prior, DType::F32, &mut rng).is_ok());

        let err = PriorValidator::check_prior_return_type(&prior, DType::F64, &mut rng).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Assertion failed: Prior return type must be float64, but is float32."
        );
    }

    #[test]
    fn test_support_check() {
        let mut rng = StdRng::seed_from_u64(3);
        let prior = BoxUniform::from_bounds(&[0.0], &[1.0]).unwrap();
        assert!(PriorValidator::check_prior_support(&prior, &mut rng).is_ok());
    }
}
