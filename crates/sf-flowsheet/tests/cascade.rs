//! End-to-end cascade runs: build, two-pass initialization, global solve.

use std::cell::RefCell;

use proptest::prelude::*;
use sf_graph::{MixingStrategy, Side};
use sf_model::{Model, Scope};
use sf_solver::{NewtonSolver, SolveOutcome, Solver, SolverResult, TerminationStatus};
use sf_units::UnitError;
use sf_flowsheet::{CascadeConfig, Flowsheet, FlowsheetError};

fn recycle_two_stages() -> CascadeConfig {
    CascadeConfig {
        stages: 2,
        tubes: 10,
        mixing: MixingStrategy::Recycle,
        ..CascadeConfig::default()
    }
}

fn fixed_flags(model: &Model) -> Vec<bool> {
    model
        .variables()
        .iter()
        .map(|v| model.is_fixed(v.id).unwrap())
        .collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * (1.0 + a.abs().max(b.abs()))
}

/// Delegates to Newton except on one block, which reports `status`.
/// Remembers every block it was asked to solve.
struct FailingOn {
    block: &'static str,
    status: TerminationStatus,
    inner: NewtonSolver,
    calls: RefCell<Vec<String>>,
}

impl FailingOn {
    fn new(block: &'static str, status: TerminationStatus) -> Self {
        Self {
            block,
            status,
            inner: NewtonSolver::default(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl Solver for FailingOn {
    fn name(&self) -> &str {
        "failing"
    }

    fn solve(&self, model: &mut Model, scope: Scope) -> SolverResult<SolveOutcome> {
        let label = match scope {
            Scope::All => model.block_path(model.root()).to_string(),
            Scope::Block(b) => model.block_path(b).to_string(),
        };
        self.calls.borrow_mut().push(label.clone());
        if label == self.block {
            return Ok(SolveOutcome {
                status: self.status,
                iterations: 3,
                residual_norm: 1.0,
                size: model.free_variables(scope).len(),
            });
        }
        self.inner.solve(model, scope)
    }
}

#[test]
fn scenario_recycle_two_stages_solves() {
    let mut fs = Flowsheet::build(recycle_two_stages()).unwrap();
    assert_eq!(fs.degrees_of_freedom(), 0);

    let solver = fs.default_solver();
    let report = fs.initialize(&solver).unwrap();
    assert_eq!(report.order.len(), fs.topology().graph.units().len());
    assert_eq!(report.guessed, ["permeate[2]"]);
    assert!(report.released > 0);
    assert!(report.records.iter().all(|r| r.dof == 0));
    assert!(report.records.iter().all(|r| r.outcome.is_optimal()));
    assert_eq!(fs.degrees_of_freedom(), 0);

    for side in Side::BOTH {
        fs.fix_precipitator_volume(side, 500.0).unwrap();
    }
    assert_eq!(fs.degrees_of_freedom(), 0);

    let outcome = fs.solve(&solver).unwrap();
    assert_eq!(outcome.status, TerminationStatus::Optimal);

    // overall solute balance around the membranes
    let streams = fs.stream_report().unwrap();
    for j in ["Li", "Co"] {
        let fed = streams.mass("feed", j).unwrap() + streams.mass("diafiltrate", j).unwrap();
        let out = streams.mass("permeate", j).unwrap() + streams.mass("retentate", j).unwrap();
        assert!(close(fed, out), "{j}: {fed} in, {out} out");
    }
    let li = fs.prec_perc_li().unwrap();
    let co = fs.prec_perc_co().unwrap();
    assert!(li > 0.0 && li < 100.0, "Li recovery {li}");
    assert!(co > 0.0 && co < 100.0, "Co recovery {co}");
}

#[test]
fn every_local_solve_is_square() {
    let config = CascadeConfig {
        stages: 3,
        tubes: 4,
        ..CascadeConfig::default()
    };
    let mut fs = Flowsheet::build(config).unwrap();
    let solver = fs.default_solver();
    let report = fs.initialize(&solver).unwrap();
    assert_eq!(report.records.len(), report.order.len());
    for record in &report.records {
        assert_eq!(record.dof, 0, "{}", record.block);
    }
    assert_eq!(report.guessed.len(), 2);
    assert_eq!(fs.degrees_of_freedom(), 0);
}

#[test]
fn single_feed_only_stage_needs_no_guess() {
    let config = CascadeConfig {
        stages: 1,
        mixing: MixingStrategy::FeedOnly,
        precipitate: false,
        ..CascadeConfig::default()
    };
    let mut fs = Flowsheet::build(config).unwrap();
    let solver = fs.default_solver();
    let report = fs.initialize(&solver).unwrap();
    assert!(report.guessed.is_empty());
    assert_eq!(
        report.order,
        [
            "feed",
            "diafiltrate",
            "mixer[1]",
            "stage[1]",
            "permeate_product",
            "retentate_product",
        ]
    );
    // one local solve per unit
    assert_eq!(report.records.len(), 6);
    assert_eq!(fs.degrees_of_freedom(), 0);
    // propagated values already satisfy every stream equality
    let outcome = fs.solve(&solver).unwrap();
    assert!(outcome.is_optimal());
}

#[test]
fn feed_only_cascade_solves() {
    let config = CascadeConfig {
        stages: 3,
        tubes: 5,
        mixing: MixingStrategy::FeedOnly,
        ..CascadeConfig::default()
    };
    let mut fs = Flowsheet::build(config).unwrap();
    let solver = fs.default_solver();
    let report = fs.initialize(&solver).unwrap();
    assert!(report.guessed.is_empty());
    fs.solve(&solver).unwrap();

    let streams = fs.stream_report().unwrap();
    let share = streams.row("diafiltrate[2]").unwrap().flow;
    assert!(close(share, 10.0));
}

#[test]
fn recycle_with_one_stage_rejected_before_init() {
    let config = CascadeConfig {
        stages: 1,
        mixing: MixingStrategy::Recycle,
        ..CascadeConfig::default()
    };
    let err = match Flowsheet::build(config) {
        Ok(_) => panic!("single-stage recycle must be rejected"),
        Err(e) => e,
    };
    assert!(matches!(err, FlowsheetError::Graph(_)));
    assert!(err.is_configuration());
}

#[test]
fn failed_local_solve_aborts_and_releases() {
    let mut fs = Flowsheet::build(recycle_two_stages()).unwrap();
    let fixed_before = fixed_flags(fs.model());

    let solver = FailingOn::new("fs.stage[1]", TerminationStatus::MaxIterations);
    let err = fs.initialize(&solver).unwrap_err();
    match &err {
        FlowsheetError::Unit(UnitError::InitializationFailed { block, status }) => {
            assert_eq!(block, "fs.stage[1]");
            assert_eq!(*status, TerminationStatus::MaxIterations);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_configuration());

    // nothing past the failing stage was visited
    let calls = solver.calls.borrow();
    assert_eq!(
        *calls,
        ["fs.feed", "fs.diafiltrate", "fs.mixer[1]", "fs.stage[1]"]
    );

    // every temporary fix was undone
    assert_eq!(fixed_before, fixed_flags(fs.model()));
    assert_eq!(fs.degrees_of_freedom(), 0);
}

#[test]
fn free_stage_parameter_stops_initialization() {
    let mut fs = Flowsheet::build(recycle_two_stages()).unwrap();
    let model = fs.model_mut();
    let stage = model.block_by_path("fs.stage[1]").unwrap();
    let flux = model.find_var(stage, "flux", ()).unwrap();
    model.unfix(flux).unwrap();
    let fixed_before = fixed_flags(fs.model());

    let solver = FailingOn::new("none", TerminationStatus::Optimal);
    let err = fs.initialize(&solver).unwrap_err();
    match &err {
        FlowsheetError::Unit(UnitError::LocalDof { block, dof }) => {
            assert_eq!(block, "fs.stage[1]");
            assert_eq!(*dof, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_configuration());
    // the DoF check runs before the stage is handed to the solver
    assert!(!solver.calls.borrow().iter().any(|b| b == "fs.stage[1]"));

    assert_eq!(fixed_before, fixed_flags(fs.model()));
    assert!(!fs.model().is_fixed(flux).unwrap());
}

#[test]
fn global_non_convergence_is_surfaced() {
    let mut fs = Flowsheet::build(recycle_two_stages()).unwrap();
    fs.initialize(&fs.default_solver()).unwrap();
    let solver = FailingOn::new("fs", TerminationStatus::TimeLimit);
    let err = fs.solve(&solver).unwrap_err();
    assert!(matches!(
        err,
        FlowsheetError::SolveFailed {
            status: TerminationStatus::TimeLimit,
            iterations: 3,
            ..
        }
    ));
}

#[test]
fn global_solve_refuses_non_square_model() {
    let mut fs = Flowsheet::build(recycle_two_stages()).unwrap();
    let volume = fs.precipitator(Side::Permeate).unwrap().volume();
    fs.model_mut().unfix(volume).unwrap();
    let err = fs.solve(&fs.default_solver()).unwrap_err();
    assert!(matches!(err, FlowsheetError::GlobalDof { dof: 1 }));
}

#[test]
fn config_file_drives_the_build() {
    let path = std::env::temp_dir().join(format!("sf-cascade-{}.yaml", std::process::id()));
    std::fs::write(&path, "stages: 3\ntubes: 2\nmixing: recycle\n").unwrap();
    let config = CascadeConfig::load_yaml(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let fs = Flowsheet::build(config).unwrap();
    assert_eq!(fs.topology().stages.len(), 3);
    assert_eq!(fs.topology().recycle_streams().len(), 2);

    let missing = CascadeConfig::load_yaml(std::path::Path::new("/nonexistent/cascade.yaml"));
    assert!(matches!(missing, Err(FlowsheetError::ConfigRead { .. })));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn release_restores_zero_dof(
        stages in 2usize..5,
        tubes in 1usize..4,
        recycle in any::<bool>(),
        precipitate in any::<bool>(),
    ) {
        let config = CascadeConfig {
            stages,
            tubes,
            mixing: if recycle { MixingStrategy::Recycle } else { MixingStrategy::FeedOnly },
            precipitate,
            ..CascadeConfig::default()
        };
        let mut fs = Flowsheet::build(config).unwrap();
        let report = fs.initialize(&fs.default_solver()).unwrap();
        prop_assert_eq!(fs.degrees_of_freedom(), 0);
        prop_assert_eq!(report.guessed.len(), if recycle { stages - 1 } else { 0 });
    }
}
