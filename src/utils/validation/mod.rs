//! Validation utilities
//!
//! Centralized checks for priors, simulators and training data.

pub mod cross_check;
pub mod prior;

pub use cross_check::CrossCheckValidator;
pub use prior::PriorValidator;
