#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # SBI Input Checks
//!
//! Validation and normalization of the user-supplied pieces of a
//! simulation-based inference pipeline: the prior, the simulator and the
//! observed data.
//!
//! ## Features
//!
//! - **Prior processing**: distributions, sequences of independent priors and
//!   custom priors become `float32` distributions with batch multiplicity ≤ 1
//! - **Simulator processing**: simulators are bridged to tensors and, when
//!   they only take one parameter vector, looped over batches
//! - **Observation normalization**: `x` gets a leading batch dimension and is
//!   checked against the simulated event shape
//! - **Cross checks**: prior/simulator consistency, `(theta, x)` training
//!   pairs, devices and estimator arguments
//!
//! ## Quick Start
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use sbi_input_checks::distributions::BoxUniform;
//! use sbi_input_checks::{
//!     CrossCheckValidator, PriorInput, PriorProcessor, SimulatorProcessor, Value,
//! };
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let prior = BoxUniform::from_bounds(&[0.0, 0.0], &[1.0, 1.0])?;
//! let processed = PriorProcessor::process_prior(PriorInput::distribution(prior), &mut rng)?;
//!
//! let simulator = |theta: &Value| -> anyhow::Result<Value> { Ok(theta.clone()) };
//! let simulator = SimulatorProcessor::process_simulator(
//!     simulator,
//!     processed.prior.as_ref(),
//!     processed.prior_returns_ndarray,
//!     &mut rng,
//! );
//! CrossCheckValidator::check_sbi_inputs(&simulator, processed.prior.as_ref(), &mut rng)?;
//! # Ok::<(), sbi_input_checks::SbiInputError>(())
//! ```
//!
//! ### Feature Flags
//!
//! - `tracing-init`: subscriber setup through [`tracing_config::TracingConfig::init`]
//! - `tracing-json`: JSON output for the subscriber

pub mod config;
pub mod distributions;
pub mod error;
pub mod estimator;
pub mod processing;
pub mod tensor;
pub mod tracing_config;
pub mod types;
pub mod utils;

use distributions::Distribution;
use rand::RngCore;

pub use config::{CustomPriorOptions, TrainingDevices};
pub use error::{Result, SbiInputError};
pub use estimator::{DensityEstimator, EstimatorArg, NetBuilder, NeuralNet};
pub use processing::{
    BatchLoopSimulator, ObservationNormalizer, PriorProcessor, ProcessedSimulator, Simulator,
    SimulatorProcessor, TensorSimulator,
};
pub use tensor::{DType, Device, Tensor, TensorData, Value};
pub use tracing_config::{TracingConfig, TracingFormat};
pub use types::{InputWarning, LegacyStatsPrior, PriorInput, ProcessedPrior};
pub use utils::{CrossCheckValidator, PriorValidator};

/// Process prior and simulator and check them against each other
///
/// # Errors
/// - Any failure of [`PriorProcessor::process_prior`]
/// - Any failure of [`CrossCheckValidator::check_sbi_inputs`]
#[deprecated(
    since = "0.1.0",
    note = "use `PriorProcessor::process_prior` and `SimulatorProcessor::process_simulator`"
)]
pub fn prepare_for_sbi<S: Simulator>(
    simulator: S,
    prior: PriorInput,
    rng: &mut dyn RngCore,
) -> Result<(ProcessedSimulator<S>, Box<dyn Distribution>)> {
    let _span = tracing_config::spans::input_check("prepare_for_sbi").entered();
    InputWarning::Deprecated {
        entry_point: "prepare_for_sbi",
    }
    .emit();

    let (prior, _, prior_returns_ndarray) = PriorProcessor::process_prior(prior, rng)?.into_parts();
    let simulator =
        SimulatorProcessor::process_simulator(simulator, prior.as_ref(), prior_returns_ndarray, rng);
    CrossCheckValidator::check_sbi_inputs(&simulator, prior.as_ref(), rng)?;
    Ok((simulator, prior))
}
