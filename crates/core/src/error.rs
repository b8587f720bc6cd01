use thiserror::Error;

#[derive(Error, Debug)]
pub enum RicfError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Variable '{0}' not found")]
    UnknownVariable(String),

    #[error("Malformed graph: {0}")]
    MalformedGraph(String),

    #[error("Invalid covariance matrix: {0}")]
    InvalidCovariance(String),

    #[error("Singular matrix encountered in {context}")]
    SingularMatrix { context: String },

    #[error("Fit did not converge after {iterations} iterations (change = {change:.2e})")]
    NotConverged { iterations: usize, change: f64 },

    #[error("Time budget exhausted after {iterations} iterations (change = {change:.2e})")]
    TimeBudgetExceeded { iterations: usize, change: f64 },

    #[error("Dimension mismatch: expected {expected}, got {got} in {context}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl RicfError {
    /// Whether this error reports a fit that ran out of sweeps or time,
    /// as opposed to bad input or a singular system.
    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            RicfError::NotConverged { .. } | RicfError::TimeBudgetExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RicfError>;
