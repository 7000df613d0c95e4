//! Processing of user priors, simulators and observations

pub mod observation;
pub mod prior;
pub mod simulator;

pub use observation::ObservationNormalizer;
pub use prior::PriorProcessor;
pub use simulator::{
    BatchLoopSimulator, ProcessedSimulator, Simulator, SimulatorProcessor, TensorSimulator,
};
