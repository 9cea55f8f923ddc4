//! Newton solver with bound projection.

use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{SolverError, SolverResult};
use crate::status::TerminationStatus;

/// Newton solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance on the residual max-norm
    pub abs_tol: f64,
    /// Relative step size below which the iteration counts as stalled
    pub rel_tol: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Relative perturbation for finite-difference Jacobians
    pub fd_epsilon: f64,
    /// Wall-clock limit in seconds
    pub time_limit_s: Option<f64>,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            abs_tol: 1e-8,
            rel_tol: 1e-14,
            line_search_beta: 0.5,
            max_line_search_iters: 30,
            fd_epsilon: 1e-7,
            time_limit_s: None,
        }
    }
}

/// Newton iteration result.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Last iterate
    pub x: DVector<f64>,
    /// Residual max-norm at `x`
    pub residual_norm: f64,
    pub iterations: usize,
    pub status: TerminationStatus,
}

/// Max-norm; NaN when any entry is not finite.
fn max_norm(r: &DVector<f64>) -> f64 {
    let mut norm = 0.0_f64;
    for v in r.iter() {
        if !v.is_finite() {
            return f64::NAN;
        }
        norm = norm.max(v.abs());
    }
    norm
}

fn project(x: &mut DVector<f64>, lower: &[f64], upper: &[f64]) {
    for ((xi, &lo), &hi) in x.iter_mut().zip(lower).zip(upper) {
        *xi = xi.clamp(lo, hi);
    }
}

/// True when some variable sits on a bound and the step pushes through it.
fn blocked_by_bounds(x: &DVector<f64>, dx: &DVector<f64>, lower: &[f64], upper: &[f64]) -> bool {
    x.iter()
        .zip(dx.iter())
        .zip(lower.iter().zip(upper))
        .any(|((&xi, &di), (&lo, &hi))| (xi <= lo && di < 0.0) || (xi >= hi && di > 0.0))
}

/// Newton solver with backtracking line search; iterates are projected onto
/// the bounds `[lower, upper]`.
///
/// Only malformed input is an `Err`; every way the iteration can end is
/// reported as a [`TerminationStatus`].
pub fn newton_solve<F, J>(
    x0: DVector<f64>,
    lower: &[f64],
    upper: &[f64],
    mut residual_fn: F,
    mut jacobian_fn: J,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: FnMut(&DVector<f64>) -> DVector<f64>,
    J: FnMut(&DVector<f64>, &DVector<f64>) -> DMatrix<f64>,
{
    let n = x0.len();
    if lower.len() != n || upper.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "bounds length {}/{} does not match {} unknowns",
                lower.len(),
                upper.len(),
                n
            ),
        });
    }

    let start = Instant::now();
    let mut x = x0;
    project(&mut x, lower, upper);
    let mut r = residual_fn(&x);
    let mut r_norm = max_norm(&r);

    let finish = |x, residual_norm, iterations, status| {
        Ok(NewtonResult {
            x,
            residual_norm,
            iterations,
            status,
        })
    };

    for iter in 0..config.max_iterations {
        trace!(iter, residual = r_norm, "newton iteration");
        if !r_norm.is_finite() {
            return finish(x, r_norm, iter, TerminationStatus::NumericalFailure);
        }
        if r_norm <= config.abs_tol {
            return finish(x, r_norm, iter, TerminationStatus::Optimal);
        }
        if let Some(limit) = config.time_limit_s {
            if start.elapsed().as_secs_f64() > limit {
                return finish(x, r_norm, iter, TerminationStatus::TimeLimit);
            }
        }

        // Solve J * dx = -r
        let jac = jacobian_fn(&x, &r);
        let Some(dx) = jac.lu().solve(&(-&r)) else {
            return finish(x, r_norm, iter, TerminationStatus::NumericalFailure);
        };

        // Line search on the projected step
        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let mut x_new = &x + alpha * &dx;
            project(&mut x_new, lower, upper);
            let r_new = residual_fn(&x_new);
            let r_new_norm = max_norm(&r_new);
            if r_new_norm.is_finite() && r_new_norm < r_norm {
                accepted = Some((x_new, r_new, r_new_norm));
                break;
            }
            alpha *= config.line_search_beta;
        }

        let Some((x_new, r_new, r_new_norm)) = accepted else {
            let status = if blocked_by_bounds(&x, &dx, lower, upper) {
                TerminationStatus::Infeasible
            } else {
                TerminationStatus::NumericalFailure
            };
            return finish(x, r_norm, iter, status);
        };

        // Check for stagnation
        let step = max_norm(&(&x_new - &x));
        let scale = max_norm(&x).max(1.0);
        x = x_new;
        r = r_new;
        r_norm = r_new_norm;
        if step <= config.rel_tol * scale && r_norm > config.abs_tol {
            return finish(x, r_norm, iter + 1, TerminationStatus::NumericalFailure);
        }
    }

    let status = if r_norm <= config.abs_tol {
        TerminationStatus::Optimal
    } else {
        TerminationStatus::MaxIterations
    };
    finish(x, r_norm, config.max_iterations, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbounded(n: usize) -> (Vec<f64>, Vec<f64>) {
        (vec![f64::NEG_INFINITY; n], vec![f64::INFINITY; n])
    }

    #[test]
    fn simple_quadratic() {
        // Solve x^2 - 4 = 0, x > 0
        let residual = |x: &DVector<f64>| DVector::from_element(1, x[0] * x[0] - 4.0);
        let jacobian = |x: &DVector<f64>, _: &DVector<f64>| DMatrix::from_element(1, 1, 2.0 * x[0]);

        let x0 = DVector::from_element(1, 3.0);
        let (lo, hi) = unbounded(1);
        let result =
            newton_solve(x0, &lo, &hi, residual, jacobian, &NewtonConfig::default()).unwrap();

        assert_eq!(result.status, TerminationStatus::Optimal);
        assert!((result.x[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn bound_keeps_positive_root() {
        // the first full step overshoots; the lower bound rules out -2
        let residual = |x: &DVector<f64>| DVector::from_element(1, x[0] * x[0] - 4.0);
        let jacobian = |x: &DVector<f64>, _: &DVector<f64>| DMatrix::from_element(1, 1, 2.0 * x[0]);
        let x0 = DVector::from_element(1, 0.5);
        let result = newton_solve(
            x0,
            &[0.0],
            &[f64::INFINITY],
            residual,
            jacobian,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert_eq!(result.status, TerminationStatus::Optimal);
        assert!((result.x[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn unreachable_root_is_infeasible() {
        // x + 1 = 0 with x >= 0
        let residual = |x: &DVector<f64>| DVector::from_element(1, x[0] + 1.0);
        let jacobian = |_: &DVector<f64>, _: &DVector<f64>| DMatrix::from_element(1, 1, 1.0);
        let result = newton_solve(
            DVector::from_element(1, 1.0),
            &[0.0],
            &[f64::INFINITY],
            residual,
            jacobian,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert_eq!(result.status, TerminationStatus::Infeasible);
        assert_eq!(result.x[0], 0.0);
    }

    #[test]
    fn singular_jacobian_is_numerical_failure() {
        let residual = |_: &DVector<f64>| DVector::from_element(1, 1.0);
        let jacobian = |_: &DVector<f64>, _: &DVector<f64>| DMatrix::zeros(1, 1);
        let (lo, hi) = unbounded(1);
        let result = newton_solve(
            DVector::zeros(1),
            &lo,
            &hi,
            residual,
            jacobian,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert_eq!(result.status, TerminationStatus::NumericalFailure);
    }

    #[test]
    fn iteration_limit_reported() {
        // x^3 = 1 from far away with one iteration allowed
        let residual = |x: &DVector<f64>| DVector::from_element(1, x[0].powi(3) - 1.0);
        let jacobian =
            |x: &DVector<f64>, _: &DVector<f64>| DMatrix::from_element(1, 1, 3.0 * x[0] * x[0]);
        let config = NewtonConfig {
            max_iterations: 1,
            ..NewtonConfig::default()
        };
        let (lo, hi) = unbounded(1);
        let result =
            newton_solve(DVector::from_element(1, 10.0), &lo, &hi, residual, jacobian, &config)
                .unwrap();
        assert_eq!(result.status, TerminationStatus::MaxIterations);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn mismatched_bounds_rejected() {
        let residual = |x: &DVector<f64>| x.clone();
        let jacobian = |_: &DVector<f64>, _: &DVector<f64>| DMatrix::identity(2, 2);
        let err = newton_solve(
            DVector::zeros(2),
            &[0.0],
            &[1.0],
            residual,
            jacobian,
            &NewtonConfig::default(),
        );
        assert!(matches!(err, Err(SolverError::ProblemSetup { .. })));
    }
}
