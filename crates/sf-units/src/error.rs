//! Error types for unit model operations.

use sf_core::CoreError;
use sf_model::ModelError;
use sf_props::PropsError;
use sf_solver::{SolverError, TerminationStatus};
use thiserror::Error;

/// Errors raised while building or initializing unit models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    /// The two sides of a bridge cannot be mapped onto each other.
    #[error("Incompatible component sets in {block}: {reason}")]
    IncompatibleSolutes { block: String, reason: String },

    #[error("Missing parameter in {block}: {what}")]
    MissingParameter { block: String, what: String },

    #[error("Invalid parameter in {block}: {source}")]
    InvalidParameter {
        block: String,
        #[source]
        source: CoreError,
    },

    /// The unit needs per-component mass flows but its package does not carry them.
    #[error("Unsupported state basis in {block}: {what}")]
    UnsupportedBasis { block: String, what: &'static str },

    /// Local degrees of freedom were not zero right before a local solve.
    #[error("{block} has {dof} degrees of freedom at initialization (expected 0)")]
    LocalDof { block: String, dof: i64 },

    /// The local solve ended with anything but an optimal status.
    #[error("Initialization of {block} failed: solver terminated with '{status}'")]
    InitializationFailed {
        block: String,
        status: TerminationStatus,
    },

    #[error(transparent)]
    Props(#[from] PropsError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

pub type UnitResult<T> = Result<T, UnitError>;

impl UnitError {
    /// True for the configuration class of failures (as opposed to a
    /// non-optimal local solve).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            UnitError::IncompatibleSolutes { .. }
                | UnitError::MissingParameter { .. }
                | UnitError::InvalidParameter { .. }
                | UnitError::UnsupportedBasis { .. }
                | UnitError::LocalDof { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = UnitError::LocalDof {
            block: "fs.stage[2]".into(),
            dof: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("fs.stage[2]"));
        assert!(msg.contains('3'));
        assert!(err.is_configuration());

        let err = UnitError::InitializationFailed {
            block: "fs.mixer[1]".into(),
            status: TerminationStatus::Infeasible,
        };
        assert!(err.to_string().contains("infeasible"));
        assert!(!err.is_configuration());
    }
}
