//! Input and output records of the processing steps

use crate::distributions::{CustomPrior, Distribution, MultipleIndependent};
use crate::tensor::Device;
use std::fmt;

/// Warnings raised while processing user inputs
///
/// Each warning is logged when emitted and also returned to the caller where
/// the operation has an output record to carry it.
#[derive(Debug, Clone, PartialEq)]
pub enum InputWarning {
    /// A sequence of priors was combined into independent components
    IndependentSequence { count: usize },
    /// A one-dimensional `Uniform` was recast to `BoxUniform`
    UniformRecast,
    /// A custom prior lacked mean or variance; both were estimated
    MomentsEstimated { num_samples: usize },
    /// A training tensor was moved to the data device
    DataRelocated {
        tensor: &'static str,
        from: Device,
        data_device: Device,
        training_device: Device,
    },
    /// A deprecated entry point was called
    Deprecated { entry_point: &'static str },
}

impl fmt::Display for InputWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndependentSequence { count } => write!(
                f,
                "Prior was provided as a sequence of {} priors. They will be interpreted as \
                 independent of each other and matched in order to the components of the parameter.",
                count
            ),
            Self::UniformRecast => write!(
                f,
                "Casting 1D Uniform prior to BoxUniform to match batch requirements."
            ),
            Self::MomentsEstimated { num_samples } => write!(
                f,
                "Prior is lacking mean or variance, estimating both from {} samples.",
                num_samples
            ),
            Self::DataRelocated {
                tensor,
                from,
                data_device,
                training_device,
            } => write!(
                f,
                "{} has device '{}'. Moving it to the data device '{}'. Training will proceed \
                 on device '{}'.",
                tensor, from, data_device, training_device
            ),
            Self::Deprecated { entry_point } => write!(
                f,
                "`{}` is deprecated and will be removed in a future release. Please use \
                 `process_prior` and `process_simulator` instead.",
                entry_point
            ),
        }
    }
}

impl InputWarning {
    /// Log the warning and hand it back
    pub fn emit(self) -> Self {
        tracing::warn!(warning = ?self, "{}", self);
        self
    }
}

/// Scipy-style frozen distribution object; no longer accepted as a prior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyStatsPrior {
    pub name: String,
}

impl LegacyStatsPrior {
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

/// A prior as supplied by the user
pub enum PriorInput {
    /// A distribution
    Distribution(Box<dyn Distribution>),
    /// Independent priors matched in order to the parameter components
    Sequence(Vec<PriorInput>),
    /// A legacy stats-library object
    Legacy(LegacyStatsPrior),
    /// An object with bare `sample`/`log_prob`
    Custom(Box<dyn CustomPrior>),
}

impl PriorInput {
    pub fn distribution<D: Distribution + 'static>(dist: D) -> Self {
        Self::Distribution(Box::new(dist))
    }

    pub fn custom<P: CustomPrior + 'static>(prior: P) -> Self {
        Self::Custom(Box::new(prior))
    }

    /// Short description of the input kind used in diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Distribution(_) => "distribution",
            Self::Sequence(_) => "sequence",
            Self::Legacy(_) => "legacy stats object",
            Self::Custom(_) => "custom prior",
        }
    }
}

impl fmt::Debug for PriorInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distribution(d) => f.debug_tuple("Distribution").field(d).finish(),
            Self::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Self::Legacy(l) => f.debug_tuple("Legacy").field(l).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<Box<dyn Distribution>> for PriorInput {
    fn from(dist: Box<dyn Distribution>) -> Self {
        Self::Distribution(dist)
    }
}

impl From<MultipleIndependent> for PriorInput {
    fn from(dist: MultipleIndependent) -> Self {
        Self::distribution(dist)
    }
}

impl From<Vec<PriorInput>> for PriorInput {
    fn from(items: Vec<PriorInput>) -> Self {
        Self::Sequence(items)
    }
}

impl From<LegacyStatsPrior> for PriorInput {
    fn from(legacy: LegacyStatsPrior) -> Self {
        Self::Legacy(legacy)
    }
}

/// A processed prior with its parameter count
#[derive(Debug)]
pub struct ProcessedPrior {
    /// Distribution returning `float32` tensors with batch multiplicity ≤ 1
    pub prior: Box<dyn Distribution>,
    /// Number of scalars in one parameter draw
    pub theta_numel: usize,
    /// Whether the user prior returned host arrays
    pub prior_returns_ndarray: bool,
    /// Warnings emitted during processing, in order
    pub warnings: Vec<InputWarning>,
}

impl ProcessedPrior {
    /// Split into `(prior, theta_numel, prior_returns_ndarray)`
    #[must_use]
    pub fn into_parts(self) -> (Box<dyn Distribution>, usize, bool) {
        (self.prior, self.theta_numel, self.prior_returns_ndarray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::BoxUniform;

    #[test]
    fn test_warning_messages() {
        let warning = InputWarning::IndependentSequence { count: 3 };
        assert!(warning.to_string().contains("sequence of 3 priors"));

        let warning = InputWarning::DataRelocated {
            tensor: "Data x",
            from: Device::Cuda(0),
            data_device: Device::Cpu,
            training_device: Device::Cuda(0),
        };
        let message = warning.emit().to_string();
        assert!(message.contains("'cuda:0'"));
        assert!(message.contains("'cpu'"));
    }

    #[test]
    fn test_prior_input_kinds() {
        let dist = PriorInput::distribution(BoxUniform::from_bounds(&[0.0], &[1.0]).unwrap());
        assert_eq!(dist.kind(), "distribution");
        assert_eq!(PriorInput::from(vec![dist]).kind(), "sequence");
        assert_eq!(PriorInput::from(LegacyStatsPrior::new("norm")).kind(), "legacy stats object");
    }
}
