//! sf-model: equation-oriented algebraic models for sepflow.
//!
//! Provides:
//! - A block tree (`fs`, `fs.stage[1]`, `fs.stage[1].properties_in`)
//! - Variables with values, fixed flags and bounds
//! - Equality constraints over expression trees, keyed by (block, name, index)
//! - Degree-of-freedom bookkeeping per block scope
//! - An override stack for temporary fixes during initialization
//!
//! # Example
//!
//! ```
//! use sf_model::{Expr, Model, Scope};
//!
//! let mut m = Model::new("fs");
//! let mixer = m.add_block(m.root(), "mixer").unwrap();
//! let a = m.add_param(mixer, "flow_in", 1, 100.0).unwrap();
//! let b = m.add_param(mixer, "flow_in", 2, 30.0).unwrap();
//! let out = m.add_var(mixer, "flow_out", (), 0.0).unwrap();
//! m.add_constraint(mixer, "eq_flow", (), Expr::Var(out), Expr::Var(a) + b).unwrap();
//!
//! assert_eq!(m.degrees_of_freedom(Scope::Block(mixer)), 0);
//! ```

pub mod dof;
pub mod error;
pub mod expr;
pub mod index;
pub mod model;
pub mod overrides;

pub use dof::{ModelStatistics, Scope};
pub use error::{ModelError, ModelResult};
pub use expr::Expr;
pub use index::{Index, IndexPart};
pub use model::{Block, Constraint, ConstraintKey, Model, Variable};
pub use overrides::{Mark, Override, OverrideKind, OverrideStack};
