//! Two-pass initialization of an assembled cascade.
//!
//! Pass 1 visits units in dependency order. Before each visit the inlet
//! states are fixed through the override stack: to the producer's outlet
//! values when the producer has already been initialized, otherwise to the
//! recycle guess. The unit then runs its own square local solve.
//!
//! Pass 2 pops the whole override stack, returning the model to its
//! designed zero degrees of freedom. It runs even when Pass 1 aborts.

use sf_core::{PortId, StreamId, UnitId};
use sf_graph::{Graph, GraphError};
use sf_model::{Model, OverrideKind, OverrideStack, Scope};
use sf_props::{StateArgs, StateBlock, StateProvider};
use sf_solver::Solver;
use sf_units::{InitContext, LocalSolveRecord, UnitModel};
use tracing::{debug, info, warn};

use crate::error::{FlowsheetError, FlowsheetResult};

/// One step of the initialization order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub unit: UnitId,
    /// Inbound streams whose producer has not been visited yet.
    pub guessed: Vec<StreamId>,
}

/// What Pass 1 and Pass 2 did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitReport {
    /// Unit names in visit order.
    pub order: Vec<String>,
    /// Streams fixed to the recycle guess.
    pub guessed: Vec<String>,
    /// Every local solve, including those of boundary units.
    pub records: Vec<LocalSolveRecord>,
    /// Overrides popped in Pass 2.
    pub released: usize,
}

/// Initialization order for `graph`.
///
/// Repeatedly picks the unvisited unit with the fewest inbound streams from
/// unvisited producers. Ties go to the unit declared first, so a graph
/// without recycle yields a plain topological order with no guesses.
pub fn plan(graph: &Graph) -> Vec<Visit> {
    let n = graph.units().len();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);

    while order.len() < n {
        let next = graph
            .units()
            .iter()
            .filter(|u| !visited[u.id.slot()])
            .min_by_key(|u| unresolved(graph, &visited, u.id).len());
        let Some(unit) = next else {
            break;
        };
        let guessed = unresolved(graph, &visited, unit.id);
        visited[unit.id.slot()] = true;
        order.push(Visit {
            unit: unit.id,
            guessed,
        });
    }
    order
}

fn unresolved(graph: &Graph, visited: &[bool], unit: UnitId) -> Vec<StreamId> {
    graph
        .inbound(unit)
        .into_iter()
        .filter(|&s| graph.producer(s).is_none_or(|p| !visited[p.slot()]))
        .collect()
}

/// State block behind a graph port.
pub(crate) fn port_state<'a>(
    graph: &Graph,
    units: &'a [Box<dyn UnitModel>],
    port: PortId,
) -> FlowsheetResult<&'a StateBlock> {
    graph
        .port(port)
        .and_then(|p| units.get(p.unit.slot())?.port(&p.name))
        .ok_or_else(|| {
            FlowsheetError::config(format!("no state block behind {}", graph.port_label(port)))
        })
}

/// Run both passes. `units` is indexed by graph unit slot.
pub(crate) fn run(
    model: &mut Model,
    graph: &Graph,
    units: &[Box<dyn UnitModel>],
    guess: &StateArgs,
    solver: &dyn Solver,
) -> FlowsheetResult<InitReport> {
    let visits = plan(graph);
    let mut overrides = OverrideStack::new();
    let mut report = InitReport::default();

    let propagated = propagate(model, graph, units, guess, solver, &visits, &mut overrides, &mut report);

    let released = overrides.release_all(model);
    if let Err(err) = &propagated {
        warn!(error = %err, "initialization aborted; overrides released");
    }
    propagated?;
    report.released = released?;

    let dof = solver.degrees_of_freedom(model, Scope::All);
    info!(
        units = report.order.len(),
        guessed = report.guessed.len(),
        released = report.released,
        dof,
        "initialization complete"
    );
    if dof != 0 {
        return Err(FlowsheetError::GlobalDof { dof });
    }
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn propagate(
    model: &mut Model,
    graph: &Graph,
    units: &[Box<dyn UnitModel>],
    guess: &StateArgs,
    solver: &dyn Solver,
    visits: &[Visit],
    overrides: &mut OverrideStack,
    report: &mut InitReport,
) -> FlowsheetResult<()> {
    for visit in visits {
        let unit = units.get(visit.unit.slot()).ok_or_else(|| {
            FlowsheetError::config(format!("no unit model for graph unit {}", visit.unit))
        })?;

        for stream_id in graph.inbound(visit.unit) {
            let stream = graph
                .stream(stream_id)
                .ok_or(GraphError::UnknownStream { stream: stream_id })?;
            let inlet = port_state(graph, units, stream.to)?;
            let (values, kind) = if visit.guessed.contains(&stream_id) {
                report.guessed.push(stream.name.clone());
                (inlet.resolve(model, guess)?, OverrideKind::Guess)
            } else {
                let outlet = port_state(graph, units, stream.from)?;
                let values = outlet
                    .state_vars()
                    .into_iter()
                    .map(|v| model.value(v))
                    .collect::<Result<Vec<_>, _>>()?;
                (values, OverrideKind::Propagated)
            };
            for (var, value) in inlet.state_vars().into_iter().zip(values) {
                overrides.push_fix(model, var, value, kind)?;
            }
        }

        debug!(
            unit = unit.name(),
            guessed = visit.guessed.len(),
            guesses_held = overrides.count(OverrideKind::Guess),
            overrides = overrides.len(),
            "visiting unit"
        );
        let mut ctx = InitContext::new(model, overrides, solver);
        let result = unit.initialize(&mut ctx);
        report.records.append(&mut ctx.records);
        result?;
        report.order.push(unit.name().to_string());
    }
    Ok(())
}
