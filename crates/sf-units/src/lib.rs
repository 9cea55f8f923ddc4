//! sf-units: unit model library for sepflow flowsheets.
//!
//! Provides equation-oriented models for:
//! - Boundary sources and products
//! - Mixers and fixed-fraction splitters
//! - Membrane diafiltration stages discretized into tube elements
//! - Precipitators with per-solute yields
//! - A translator bridge between two property representations
//!
//! Every unit implements [`UnitModel`]. With its inlet states and parameters
//! fixed a unit is square, so [`UnitModel::initialize`] can hold the inlets,
//! estimate, solve the unit block on its own and release the holds.

pub mod boundary;
pub mod common;
pub mod error;
pub mod membrane;
pub mod mixer;
pub mod precipitator;
pub mod splitter;
pub mod traits;
pub mod translator;

// Re-exports
pub use boundary::{Product, Source};
pub use error::{UnitError, UnitResult};
pub use membrane::{MembraneParams, MembraneStage};
pub use mixer::Mixer;
pub use precipitator::{Precipitator, PrecipitatorParams};
pub use splitter::Splitter;
pub use traits::{InitContext, LocalSolveRecord, NamedState, UnitModel};
pub use translator::{Translator, TranslatorConfig};
