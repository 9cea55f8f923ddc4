//! sf-props: property packages and state blocks for sepflow.
//!
//! Provides:
//! - `SoluteSet`: ordered, de-duplicated component sets shared by a model
//! - `PropertyPackage`: factories that add state variables to a model
//! - `StateProvider`: the accessor and initialize/release contract that
//!   unit models and the sequencer rely on
//! - A component catalog for the solvent-extraction / leaching interface
//!
//! The rest of sepflow treats states as opaque: it reads `flow_vol` and
//! `conc_mass_comp` through the provider interface and never inspects a
//! package's internals.

pub mod catalog;
pub mod error;
pub mod package;
pub mod solutes;
pub mod state;

pub use catalog::{
    ComponentEntry, ComponentKind, LEACH_ACIDS, SX_METALS, WATER, cataloged_set,
    leach_solution_package, lookup, sx_aqueous_package,
};
pub use error::{PropsError, PropsResult};
pub use package::{AqueousPackage, PropertyPackage, SoluteFlowPackage};
pub use solutes::SoluteSet;
pub use state::{Basis, InitFlags, StateArgs, StateBlock, StateProvider, UnitSet};
