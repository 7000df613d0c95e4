//! Seams to the neural estimators that consume validated training data

use crate::tensor::Tensor;
use std::fmt;
use std::sync::Arc;

/// Conditional density estimator `q(input | condition)`
pub trait DensityEstimator: Send + Sync {
    /// Log-density of `input` given `condition`, one value per batch entry
    ///
    /// # Errors
    /// - Shape mismatches between the inputs and the network layers
    fn log_prob(&self, input: &Tensor, condition: &Tensor) -> anyhow::Result<Tensor>;
}

/// An instantiated network
///
/// Networks that estimate densities expose themselves through
/// [`NeuralNet::as_density_estimator`]; classifiers and other networks keep
/// the default.
pub trait NeuralNet: Send + Sync {
    fn name(&self) -> &str;

    fn as_density_estimator(&self) -> Option<&dyn DensityEstimator> {
        None
    }
}

/// Constructor building a network from a batch of `(theta, x)`
pub type NetBuilder = Arc<dyn Fn(&Tensor, &Tensor) -> anyhow::Result<Box<dyn NeuralNet>> + Send + Sync>;

/// The density or ratio estimator argument of an inference method
pub enum EstimatorArg {
    /// Name of a built-in estimator, e.g. `"maf"`
    Name(String),
    /// Network constructor
    Builder(NetBuilder),
    /// Already instantiated network
    Network(Box<dyn NeuralNet>),
}

impl EstimatorArg {
    pub fn name<S: Into<String>>(name: S) -> Self {
        Self::Name(name.into())
    }

    pub fn builder<F>(build: F) -> Self
    where
        F: Fn(&Tensor, &Tensor) -> anyhow::Result<Box<dyn NeuralNet>> + Send + Sync + 'static,
    {
        Self::Builder(Arc::new(build))
    }

    /// Type description used in diagnostics
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Name(_) => "String".to_string(),
            Self::Builder(_) => "network builder".to_string(),
            Self::Network(net) => format!("instantiated network `{}`", net.name()),
        }
    }
}

impl fmt::Debug for EstimatorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Builder(_) => f.write_str("Builder(..)"),
            Self::Network(net) => f.debug_tuple("Network").field(&net.name()).finish(),
        }
    }
}
