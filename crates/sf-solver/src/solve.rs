//! Solver capability and the Newton implementation over model scopes.

use sf_model::{Model, Scope};
use tracing::{debug, warn};

use crate::error::SolverResult;
use crate::newton::{NewtonConfig, newton_solve};
use crate::problem::ResidualSystem;
use crate::status::{SolveOutcome, TerminationStatus};

/// Anything that can drive a square model scope to a solution.
///
/// Implementations write their final iterate back into the model whatever
/// the status; callers decide what a non-optimal status means.
pub trait Solver {
    fn name(&self) -> &str;

    fn solve(&self, model: &mut Model, scope: Scope) -> SolverResult<SolveOutcome>;

    fn degrees_of_freedom(&self, model: &Model, scope: Scope) -> i64 {
        model.degrees_of_freedom(scope)
    }
}

/// Dense Newton with a finite-difference Jacobian.
#[derive(Debug, Clone, Default)]
pub struct NewtonSolver {
    pub config: NewtonConfig,
}

impl NewtonSolver {
    pub fn new(config: NewtonConfig) -> Self {
        Self { config }
    }
}

impl Solver for NewtonSolver {
    fn name(&self) -> &str {
        "newton"
    }

    fn solve(&self, model: &mut Model, scope: Scope) -> SolverResult<SolveOutcome> {
        let label = match scope {
            Scope::All => model.block_path(model.root()).to_string(),
            Scope::Block(b) => model.block_path(b).to_string(),
        };

        let (vars, result) = {
            let mut system = ResidualSystem::new(model, scope)?;
            if system.is_empty() {
                debug!(scope = %label, "empty system, nothing to solve");
                return Ok(SolveOutcome {
                    status: TerminationStatus::Optimal,
                    iterations: 0,
                    residual_norm: 0.0,
                    size: 0,
                });
            }
            let (lower, upper) = system.bounds();
            let x0 = system.x0();
            let eps = self.config.fd_epsilon;
            // both closures need the system mutably; they never run concurrently
            let system = std::cell::RefCell::new(&mut system);
            let result = newton_solve(
                x0,
                &lower,
                &upper,
                |x| system.borrow_mut().residuals(x),
                |x, r| system.borrow_mut().jacobian(x, r, eps),
                &self.config,
            )?;
            let vars = system.borrow().vars().to_vec();
            (vars, result)
        };

        for (var, &value) in vars.iter().zip(result.x.iter()) {
            if value.is_finite() {
                model.set_value(*var, value)?;
            }
        }

        let outcome = SolveOutcome {
            status: result.status,
            iterations: result.iterations,
            residual_norm: result.residual_norm,
            size: vars.len(),
        };
        if outcome.is_optimal() {
            debug!(
                scope = %label,
                size = outcome.size,
                iterations = outcome.iterations,
                residual = outcome.residual_norm,
                "solve converged"
            );
        } else {
            warn!(
                scope = %label,
                status = %outcome.status,
                iterations = outcome.iterations,
                residual = outcome.residual_norm,
                "solve did not converge"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_model::Expr;

    #[test]
    fn solves_block_scope_only() {
        let mut m = Model::new("fs");
        let a = m.add_block(m.root(), "a").unwrap();
        let b = m.add_block(m.root(), "b").unwrap();
        let x = m.add_var(a, "x", (), 1.0).unwrap();
        let y = m.add_var(b, "y", (), 1.0).unwrap();
        m.add_constraint(a, "sq", (), Expr::Var(x) * x, 9.0).unwrap();
        m.add_constraint(b, "lin", (), Expr::Var(y), 5.0).unwrap();

        let solver = NewtonSolver::default();
        let out = solver.solve(&mut m, Scope::Block(a)).unwrap();
        assert!(out.is_optimal());
        assert_eq!(out.size, 1);
        assert!((m.value(x).unwrap() - 3.0).abs() < 1e-8);
        // block b untouched
        assert_eq!(m.value(y).unwrap(), 1.0);
    }

    #[test]
    fn empty_scope_is_trivially_optimal() {
        let mut m = Model::new("fs");
        let out = NewtonSolver::default().solve(&mut m, Scope::All).unwrap();
        assert!(out.is_optimal());
        assert_eq!(out.size, 0);
    }

    #[test]
    fn dof_query_defaults_to_model() {
        let mut m = Model::new("fs");
        let x = m.add_var(m.root(), "x", (), 1.0).unwrap();
        m.add_var(m.root(), "y", (), 1.0).unwrap();
        m.add_constraint(m.root(), "eq", (), Expr::Var(x), 1.0).unwrap();
        assert_eq!(NewtonSolver::default().degrees_of_freedom(&m, Scope::All), 0);
    }
}
