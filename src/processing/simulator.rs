//! Simulator processing: tensor bridging and batch bridging

use crate::distributions::Distribution;
use crate::error::{Result, SbiInputError};
use crate::tensor::{DType, Tensor, Value};
use rand::RngCore;
use tracing::{debug, instrument};

/// Number of parameter vectors fed to the simulator when probing for batching
const BATCH_PROBE_SIZE: usize = 2;

/// A stochastic simulator mapping parameters to observations
///
/// Implemented for every closure `Fn(&Value) -> anyhow::Result<Value>`.
pub trait Simulator: Send + Sync {
    /// Simulate observations for `theta`
    ///
    /// # Errors
    /// - Any failure of the user simulator
    fn simulate(&self, theta: &Value) -> anyhow::Result<Value>;
}

impl<F> Simulator for F
where
    F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync,
{
    fn simulate(&self, theta: &Value) -> anyhow::Result<Value> {
        self(theta)
    }
}

/// Stage 1: feeds the simulator tensors (or host arrays) and casts its output to
/// a `float32` tensor
///
/// Every call converts input and output, so this costs a copy per call on top
/// of the simulation itself.
#[derive(Debug, Clone)]
pub struct TensorSimulator<S> {
    simulator: S,
    ndarray_input: bool,
}

impl<S: Simulator> TensorSimulator<S> {
    #[must_use]
    pub fn new(simulator: S, ndarray_input: bool) -> Self {
        Self {
            simulator,
            ndarray_input,
        }
    }

    /// Whether the simulator receives host arrays instead of tensors
    #[must_use]
    pub fn ndarray_input(&self) -> bool {
        self.ndarray_input
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.simulator
    }

    /// Run the user simulator on `theta`
    ///
    /// # Errors
    /// - `Simulation` when the user simulator fails
    pub fn simulate_tensor(&self, theta: &Tensor) -> Result<Tensor> {
        let input = if self.ndarray_input {
            Value::NdArray(theta.to_f64_array())
        } else {
            Value::Tensor(theta.clone())
        };
        let output = self.simulator.simulate(&input).map_err(SbiInputError::Simulation)?;
        Ok(output.to_tensor(DType::F32).with_device(theta.device()))
    }
}

/// Applies a single-parameter simulator row by row and stacks the outputs
///
/// Only the calling convention is batched; rows are simulated one after the other.
#[derive(Debug, Clone)]
pub struct BatchLoopSimulator<S> {
    inner: TensorSimulator<S>,
}

impl<S: Simulator> BatchLoopSimulator<S> {
    #[must_use]
    pub fn new(inner: TensorSimulator<S>) -> Self {
        Self { inner }
    }

    /// Simulate every row of `theta`
    ///
    /// # Errors
    /// - `Assertion` when `theta` has no batch dimension
    /// - `Simulation` when any row fails
    pub fn simulate_tensor(&self, theta: &Tensor) -> Result<Tensor> {
        if theta.ndim() <= 1 {
            return Err(SbiInputError::assertion("Theta must have a batch dimension."));
        }
        let xs = theta
            .rows()?
            .iter()
            .map(|row| self.inner.simulate_tensor(row))
            .collect::<Result<Vec<_>>>()?;
        Tensor::stack(&xs)
    }
}

/// A simulator accepting and returning batched `float32` tensors
#[derive(Debug, Clone)]
pub enum ProcessedSimulator<S> {
    /// The user simulator handles batches itself
    Batched(TensorSimulator<S>),
    /// The user simulator is looped over the batch
    Looped(BatchLoopSimulator<S>),
}

impl<S: Simulator> ProcessedSimulator<S> {
    /// Simulate a batch of parameter vectors
    ///
    /// # Errors
    /// - `Simulation` when the user simulator fails
    /// - `Assertion` when a looped simulator receives unbatched parameters
    pub fn simulate_tensor(&self, theta: &Tensor) -> Result<Tensor> {
        match self {
            Self::Batched(simulator) => simulator.simulate_tensor(theta),
            Self::Looped(simulator) => simulator.simulate_tensor(theta),
        }
    }

    #[must_use]
    pub fn is_batched(&self) -> bool {
        matches!(self, Self::Batched(_))
    }
}

impl<S: Simulator> Simulator for ProcessedSimulator<S> {
    fn simulate(&self, theta: &Value) -> anyhow::Result<Value> {
        let theta = theta.to_tensor(DType::F32);
        Ok(Value::Tensor(self.simulate_tensor(&theta)?))
    }
}

/// Processor for user simulators
pub struct SimulatorProcessor;

impl SimulatorProcessor {
    /// Make `user_simulator` accept and return batched `float32` tensors
    ///
    /// `is_ndarray_simulator` is the `prior_returns_ndarray` flag of the
    /// processed prior; such simulators receive host arrays.
    #[instrument(skip(user_simulator, prior, rng), fields(prior = prior.name()))]
    pub fn process_simulator<S: Simulator>(
        user_simulator: S,
        prior: &dyn Distribution,
        is_ndarray_simulator: bool,
        rng: &mut dyn RngCore,
    ) -> ProcessedSimulator<S> {
        let simulator = Self::wrap_as_tensor_simulator(user_simulator, is_ndarray_simulator);
        Self::ensure_batched_simulator(simulator, prior, rng)
    }

    /// Stage 1 of [`Self::process_simulator`]
    #[must_use]
    pub fn wrap_as_tensor_simulator<S: Simulator>(
        simulator: S,
        is_ndarray_simulator: bool,
    ) -> TensorSimulator<S> {
        TensorSimulator::new(simulator, is_ndarray_simulator)
    }

    /// Stage 2 of [`Self::process_simulator`]
    ///
    /// Probes the simulator with a batch of two parameter vectors. It counts as
    /// batched if the output has a leading dimension of two; any failure of the
    /// probe falls back to a [`BatchLoopSimulator`].
    pub fn ensure_batched_simulator<S: Simulator>(
        simulator: TensorSimulator<S>,
        prior: &dyn Distribution,
        rng: &mut dyn RngCore,
    ) -> ProcessedSimulator<S> {
        let probe = prior
            .sample(&[BATCH_PROBE_SIZE], rng)
            .and_then(|theta| simulator.simulate_tensor(&theta));

        match probe {
            Ok(x) if x.ndim() > 1 && x.batch_size() == Some(BATCH_PROBE_SIZE) => {
                debug!(output_shape = ?x.shape(), "Simulator handles batches");
                ProcessedSimulator::Batched(simulator)
            },
            Ok(x) => {
                debug!(output_shape = ?x.shape(), "Simulator output is not batched, looping over parameters");
                ProcessedSimulator::Looped(BatchLoopSimulator::new(simulator))
            },
            Err(err) => {
                debug!(error = %err, "Batched probe failed, looping over parameters");
                ProcessedSimulator::Looped(BatchLoopSimulator::new(simulator))
            },
        }
    }
}
