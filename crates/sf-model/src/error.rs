//! Model construction and bookkeeping errors.

use sf_core::{BlockId, ConId, CoreError, VarId};
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown variable {0}")]
    UnknownVar(VarId),

    #[error("Unknown constraint {0}")]
    UnknownConstraint(ConId),

    #[error("Unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("Block {path} already exists")]
    DuplicateBlock { path: String },

    #[error("Variable {key} already exists")]
    DuplicateVariable { key: String },

    #[error("Constraint {key} already exists")]
    DuplicateConstraint { key: String },

    #[error("Constraint {key} references unknown variable {var}")]
    DanglingReference { key: String, var: VarId },

    #[error("Invalid value for {name}: {source}")]
    InvalidValue {
        name: String,
        #[source]
        source: CoreError,
    },
}
