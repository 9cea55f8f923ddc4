//! sf-core: stable foundation for sepflow.
//!
//! Contains:
//! - units (uom SI types + constructors for process flows and concentrations)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for model, graph and flowsheet objects)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
