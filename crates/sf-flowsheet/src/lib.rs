//! sf-flowsheet: membrane diafiltration cascades.
//!
//! Builds a cascade from a [`CascadeConfig`], initializes it in two passes
//! and runs a single global solve:
//!
//! 1. [`Flowsheet::build`] assembles the stage graph, one unit model per
//!    graph unit and the stream equalities between them.
//! 2. [`Flowsheet::initialize`] visits units in dependency order, fixing
//!    inlets to propagated or guessed values and solving each unit locally,
//!    then releases every temporary fix.
//! 3. [`Flowsheet::solve`] checks the model is square and solves it once.

pub mod config;
pub mod error;
pub mod flowsheet;
pub mod report;
pub mod sequencer;

pub use config::{CascadeConfig, SideYields, StreamSpec};
pub use error::{FlowsheetError, FlowsheetResult};
pub use flowsheet::Flowsheet;
pub use report::{StreamReport, StreamRow};
pub use sequencer::{InitReport, Visit, plan};
