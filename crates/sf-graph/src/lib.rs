//! sf-graph: stage graph layer for sepflow.
//!
//! Provides:
//! - Core graph data structures (Unit, Port, Stream, Graph)
//! - Incremental graph builder with validation (no dangling ports)
//! - Diafiltration cascade topologies for each mixing strategy
//!
//! # Example
//!
//! ```
//! use sf_graph::{MixingStrategy, TopologySpec, build_topology};
//!
//! let spec = TopologySpec {
//!     stages: 2,
//!     tubes: 10,
//!     strategy: MixingStrategy::Recycle,
//!     precipitate: false,
//! };
//! let topo = build_topology(&spec).unwrap();
//!
//! assert_eq!(topo.stages.len(), 2);
//! assert_eq!(topo.recycle_streams().len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod topology;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::GraphBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{Graph, Port, PortKind, Stream, StreamKind, Unit, UnitKind};
pub use topology::{
    MixingStrategy, Side, StageUnits, Topology, TopologySpec, build_topology, mixer_name,
    stage_name,
};
