mod convergence;
mod information;

pub use convergence::ConvergenceMonitor;
pub use information::{free_parameters, ModelFit};
