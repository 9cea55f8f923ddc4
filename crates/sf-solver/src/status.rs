//! Termination statuses.

use std::fmt;

/// Verdict of a solve attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationStatus {
    /// Residuals within tolerance at a point inside all bounds.
    Optimal,
    MaxIterations,
    /// Wall-clock limit reached.
    TimeLimit,
    /// Singular Jacobian, non-finite residuals or a stalled line search.
    NumericalFailure,
    /// No progress possible without leaving the variable bounds.
    Infeasible,
}

impl TerminationStatus {
    pub fn is_optimal(self) -> bool {
        self == TerminationStatus::Optimal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TerminationStatus::Optimal => "optimal",
            TerminationStatus::MaxIterations => "maxIterations",
            TerminationStatus::TimeLimit => "maxTimeLimit",
            TerminationStatus::NumericalFailure => "error",
            TerminationStatus::Infeasible => "infeasible",
        }
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus convergence summary of one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOutcome {
    pub status: TerminationStatus,
    pub iterations: usize,
    /// Max-norm of the residuals at the returned point.
    pub residual_norm: f64,
    /// Size of the square system that was solved.
    pub size: usize,
}

impl SolveOutcome {
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}
