//! Error types for solver operations.

use sf_model::ModelError;
use thiserror::Error;

/// Errors that stop a solve before it starts.
///
/// Non-convergence is not an error: it is reported through
/// [`TerminationStatus`](crate::TerminationStatus).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

pub type SolverResult<T> = Result<T, SolverError>;
