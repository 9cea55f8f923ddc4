//! Square-system solver for sepflow models.
//!
//! A [`Solver`] takes a model scope whose free variables and active
//! constraints balance (zero degrees of freedom), drives the residuals to
//! zero and writes the result back into the model. The bundled
//! [`NewtonSolver`] uses a finite-difference Jacobian over the constraint
//! incidence pattern and keeps iterates inside variable bounds.

pub mod error;
pub mod jacobian;
pub mod newton;
pub mod problem;
pub mod solve;
pub mod status;

pub use error::{SolverError, SolverResult};
pub use newton::{NewtonConfig, NewtonResult, newton_solve};
pub use problem::ResidualSystem;
pub use solve::{NewtonSolver, Solver};
pub use status::{SolveOutcome, TerminationStatus};
