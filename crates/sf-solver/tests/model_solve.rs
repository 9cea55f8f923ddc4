//! Solving small balance models through the `Solver` trait.

use proptest::prelude::*;
use sf_model::{Expr, Model, Scope};
use sf_solver::{NewtonConfig, NewtonSolver, Solver, SolverError, TerminationStatus};

/// Mixer followed by a fixed-fraction splitter, written as balances.
fn mixer_splitter(feed: f64, recycle: f64, fraction: f64) -> (Model, [sf_core::VarId; 3]) {
    let mut m = Model::new("fs");
    let root = m.root();
    let f = m.add_param(root, "feed", (), feed).unwrap();
    let r = m.add_param(root, "recycle", (), recycle).unwrap();
    let s = m.add_param(root, "fraction", (), fraction).unwrap();
    let mixed = m.add_var(root, "mixed", (), 1.0).unwrap();
    let out_a = m.add_var(root, "out", "a", 1.0).unwrap();
    let out_b = m.add_var(root, "out", "b", 1.0).unwrap();
    m.add_constraint(root, "eq_mix", (), Expr::Var(mixed), Expr::Var(f) + r)
        .unwrap();
    m.add_constraint(root, "eq_split", "a", Expr::Var(out_a), Expr::Var(s) * mixed)
        .unwrap();
    m.add_constraint(root, "eq_split", "b", Expr::Var(out_a) + out_b, Expr::Var(mixed))
        .unwrap();
    (m, [mixed, out_a, out_b])
}

#[test]
fn linear_balances_converge() {
    let (mut m, [mixed, a, b]) = mixer_splitter(100.0, 30.0, 0.25);
    let out = NewtonSolver::default().solve(&mut m, Scope::All).unwrap();
    assert_eq!(out.status, TerminationStatus::Optimal);
    assert_eq!(out.size, 3);
    assert!((m.value(mixed).unwrap() - 130.0).abs() < 1e-8);
    assert!((m.value(a).unwrap() - 32.5).abs() < 1e-8);
    assert!((m.value(b).unwrap() - 97.5).abs() < 1e-8);
}

#[test]
fn underspecified_scope_is_setup_error() {
    let (mut m, [mixed, ..]) = mixer_splitter(100.0, 30.0, 0.25);
    let root = m.root();
    let feed = m.find_var(root, "feed", ()).unwrap();
    m.unfix(feed).unwrap();
    let before = m.value(mixed).unwrap();
    let err = NewtonSolver::default().solve(&mut m, Scope::All).unwrap_err();
    assert!(matches!(err, SolverError::ProblemSetup { .. }));
    // nothing written back
    assert_eq!(m.value(mixed).unwrap(), before);
}

#[test]
fn non_optimal_status_is_returned_not_raised() {
    // x >= 0 and x = -1 cannot both hold
    let mut m = Model::new("fs");
    let x = m.add_var(m.root(), "x", (), 1.0).unwrap();
    m.set_bounds(x, Some(0.0), None).unwrap();
    m.add_constraint(m.root(), "eq", (), Expr::Var(x), -1.0).unwrap();
    let out = NewtonSolver::default().solve(&mut m, Scope::All).unwrap();
    assert_eq!(out.status, TerminationStatus::Infeasible);
    assert!(!out.is_optimal());
}

#[test]
fn iteration_limit_surfaces_as_status() {
    let mut m = Model::new("fs");
    let x = m.add_var(m.root(), "x", (), 50.0).unwrap();
    m.add_constraint(m.root(), "cube", (), Expr::Var(x) * x * x, 2.0).unwrap();
    let solver = NewtonSolver::new(NewtonConfig {
        max_iterations: 2,
        ..NewtonConfig::default()
    });
    let out = solver.solve(&mut m, Scope::All).unwrap();
    assert_eq!(out.status, TerminationStatus::MaxIterations);
}

proptest! {
    #[test]
    fn mixer_splitter_closes_balance(
        feed in 1.0f64..500.0,
        recycle in 0.0f64..200.0,
        fraction in 0.01f64..0.99,
    ) {
        let (mut m, [mixed, a, b]) = mixer_splitter(feed, recycle, fraction);
        let out = NewtonSolver::default().solve(&mut m, Scope::All).unwrap();
        prop_assert!(out.is_optimal());
        let total = m.value(a).unwrap() + m.value(b).unwrap();
        prop_assert!((total - m.value(mixed).unwrap()).abs() < 1e-6);
        prop_assert!((m.value(mixed).unwrap() - (feed + recycle)).abs() < 1e-6);
    }
}
