//! Error types for the SMT layer.

use thiserror::Error;

/// Errors that can occur while querying the placement solver.
#[derive(Error, Debug)]
pub enum SolverError {
    /// A model was requested but the last check was not satisfiable.
    #[error("no model available: last check was not satisfiable")]
    ModelUnavailable,

    /// A model value did not fit the exact rational extraction range.
    #[error("model value for {0} out of extraction range")]
    ModelOutOfRange(String),
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;
