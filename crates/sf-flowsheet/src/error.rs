//! Error types for flowsheet assembly, initialization and solve.

use std::path::PathBuf;

use sf_graph::GraphError;
use sf_model::ModelError;
use sf_props::PropsError;
use sf_solver::{SolverError, TerminationStatus};
use sf_units::UnitError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowsheetError {
    #[error("Configuration error: {what}")]
    Config { what: String },

    #[error("Topology error: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Props(#[from] PropsError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    /// The assembled model is not square after the release pass.
    #[error("Flowsheet has {dof} degrees of freedom before the global solve (expected 0)")]
    GlobalDof { dof: i64 },

    /// The global solve ended with a non-optimal status.
    #[error(
        "Global solve failed: solver terminated with '{status}' after {iterations} iterations (residual {residual_norm:e})"
    )]
    SolveFailed {
        status: TerminationStatus,
        iterations: usize,
        residual_norm: f64,
    },

    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type FlowsheetResult<T> = Result<T, FlowsheetError>;

impl FlowsheetError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        FlowsheetError::Config { what: what.into() }
    }

    /// True for errors raised before any numerical work: bad parameters,
    /// impossible topologies, incompatible packages and DoF mismatches.
    pub fn is_configuration(&self) -> bool {
        match self {
            FlowsheetError::Config { .. }
            | FlowsheetError::Graph(_)
            | FlowsheetError::Props(_)
            | FlowsheetError::GlobalDof { .. }
            | FlowsheetError::ConfigRead { .. }
            | FlowsheetError::Yaml(_) => true,
            FlowsheetError::Unit(e) => e.is_configuration(),
            _ => false,
        }
    }
}
