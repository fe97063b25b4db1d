// Engine error taxonomy.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed request, rejected before any computation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No selection satisfies the constraints (e.g. budget too low).
    #[error("infeasible: {0}")]
    Infeasible(String),

    /// The solver ran out of time before finding any feasible selection.
    #[error("solver exceeded its {budget_ms}ms budget without a feasible selection")]
    SolverTimeout { budget_ms: u64 },
}

pub type Result<T> = std::result::Result<T, EngineError>;

pub(crate) fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidInput(message.into())
}
