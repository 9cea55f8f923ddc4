//! Graph-specific error types.

use sf_core::{PortId, StreamId};

use crate::graph::PortKind;

pub type GraphResult<T> = Result<T, GraphError>;

/// Topology construction and validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A count parameter is zero.
    InvalidCount { what: &'static str, value: usize },

    /// Stage and tube counts that the chosen mixing strategy cannot realize.
    IncompatibleCounts {
        strategy: String,
        stages: usize,
        tubes: usize,
        reason: &'static str,
    },

    /// Two units share a name.
    DuplicateUnit { name: String },

    /// A stream refers to a port name that the unit does not have.
    UnknownPort { unit: String, port: String },

    /// A stream leaves an inlet or enters an outlet.
    PortDirection { stream: String, port: PortId },

    /// A port with no stream attached.
    DanglingPort {
        unit: String,
        port: String,
        kind: PortKind,
    },

    /// A port with more than one stream attached.
    MultiplyConnected {
        unit: String,
        port: String,
        count: usize,
    },

    /// Stream id out of range.
    UnknownStream { stream: StreamId },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::InvalidCount { what, value } => {
                write!(f, "Invalid {}: {} (must be at least 1)", what, value)
            }
            GraphError::IncompatibleCounts {
                strategy,
                stages,
                tubes,
                reason,
            } => {
                write!(
                    f,
                    "Mixing strategy '{}' cannot build {} stage(s) with {} tube(s): {}",
                    strategy, stages, tubes, reason
                )
            }
            GraphError::DuplicateUnit { name } => {
                write!(f, "Unit '{}' declared twice", name)
            }
            GraphError::UnknownPort { unit, port } => {
                write!(f, "Unit '{}' has no port '{}'", unit, port)
            }
            GraphError::PortDirection { stream, port } => {
                write!(
                    f,
                    "Stream '{}' attaches to port {} against its direction",
                    stream, port
                )
            }
            GraphError::DanglingPort { unit, port, kind } => {
                write!(f, "{:?} port {}.{} is not connected", kind, unit, port)
            }
            GraphError::MultiplyConnected { unit, port, count } => {
                write!(
                    f,
                    "Port {}.{} has {} streams attached (expected 1)",
                    unit, port, count
                )
            }
            GraphError::UnknownStream { stream } => {
                write!(f, "Stream {} not found", stream)
            }
        }
    }
}

impl std::error::Error for GraphError {}
