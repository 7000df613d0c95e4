//! Error types for prior, simulator and observation checks

use thiserror::Error;

/// Result type alias for input-check operations
pub type Result<T> = std::result::Result<T, SbiInputError>;

/// Error types for input-check operations
///
/// The variants follow the failure taxonomy of the checks: contract
/// violations (`MissingMethod`, `CallingConvention`), shape and value
/// violations (`InvalidValue`), invariant assertions (`Assertion`) and
/// deprecated or unsupported paths (`NotImplemented`).
#[derive(Error, Debug)]
pub enum SbiInputError {
    /// A user object lacks a required method
    #[error("Missing method: {0}")]
    MissingMethod(String),

    /// A user method exists but rejects the required calling convention or
    /// returns an unsupported type
    #[error("Type error: {0}")]
    CallingConvention(String),

    /// Invalid shape or value (scalar priors, oversized batch shapes, ...)
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// An invariant check failed (dtype, batch size, device)
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// The requested path is deprecated or a capability is not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Array shape errors from `ndarray`
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// The user simulator failed
    #[error("Simulation failed: {0}")]
    Simulation(#[source] anyhow::Error),

    /// A density estimator failed on a probe evaluation
    #[error("Density estimator evaluation failed. {hint}")]
    EstimatorFailure {
        hint: String,
        #[source]
        source: anyhow::Error,
    },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SbiInputError {
    /// Create a new missing-method error
    pub fn missing_method<S: Into<String>>(msg: S) -> Self {
        Self::MissingMethod(msg.into())
    }

    /// Create a new calling-convention error
    pub fn calling_convention<S: Into<String>>(msg: S) -> Self {
        Self::CallingConvention(msg.into())
    }

    /// Create a new invalid value error
    pub fn invalid_value<S: Into<String>>(msg: S) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Create a new assertion error
    pub fn assertion<S: Into<String>>(msg: S) -> Self {
        Self::Assertion(msg.into())
    }

    /// Create a new not-implemented error
    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an assertion error with expected and actual values
    pub fn expectation_error<E: std::fmt::Display, A: std::fmt::Display>(
        what: &str,
        expected: E,
        actual: A,
    ) -> Self {
        Self::Assertion(format!("{} must be {}, but is {}.", what, expected, actual))
    }

    /// Create a shape error naming the operation and offending shape
    pub fn shape_mismatch(operation: &str, expected: &[usize], actual: &[usize]) -> Self {
        Self::InvalidValue(format!(
            "Shape mismatch in {}: expected trailing dimensions {:?}, got {:?}",
            operation, expected, actual
        ))
    }

    /// Whether this error reports an unimplemented capability
    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}
