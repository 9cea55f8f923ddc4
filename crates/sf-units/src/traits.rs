//! Core traits for unit models.

use sf_core::BlockId;
use sf_model::{Model, OverrideStack, Scope};
use sf_props::{InitFlags, StateArgs, StateBlock, StateProvider};
use sf_solver::{SolveOutcome, Solver};
use tracing::debug;

use crate::error::{UnitError, UnitResult};

/// A unit port together with the state block behind it.
#[derive(Debug, Clone)]
pub struct NamedState {
    pub port: String,
    pub state: StateBlock,
}

/// Result of one local solve during initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSolveRecord {
    pub block: String,
    /// Degrees of freedom measured right before the solve.
    pub dof: i64,
    pub outcome: SolveOutcome,
}

/// Mutable state threaded through unit initializers.
pub struct InitContext<'a> {
    pub model: &'a mut Model,
    pub overrides: &'a mut OverrideStack,
    pub solver: &'a dyn Solver,
    /// Local solves in the order they ran.
    pub records: Vec<LocalSolveRecord>,
}

impl<'a> InitContext<'a> {
    pub fn new(
        model: &'a mut Model,
        overrides: &'a mut OverrideStack,
        solver: &'a dyn Solver,
    ) -> Self {
        Self {
            model,
            overrides,
            solver,
            records: Vec::new(),
        }
    }

    /// Check that `block` is square, solve it and require an optimal status.
    pub fn solve_local(&mut self, block: BlockId) -> UnitResult<LocalSolveRecord> {
        let scope = Scope::Block(block);
        let path = self.model.block_path(block).to_string();
        let dof = self.solver.degrees_of_freedom(self.model, scope);
        if dof != 0 {
            return Err(UnitError::LocalDof { block: path, dof });
        }

        let outcome = self.solver.solve(self.model, scope)?;
        let record = LocalSolveRecord {
            block: path,
            dof,
            outcome,
        };
        self.records.push(record.clone());

        if !outcome.is_optimal() {
            return Err(UnitError::InitializationFailed {
                block: record.block,
                status: outcome.status,
            });
        }
        Ok(record)
    }
}

/// A unit of the flowsheet: a block of variables and constraints with named
/// inlet and outlet states.
///
/// With every inlet state fixed and its parameters fixed, a unit is square:
/// its block scope has zero degrees of freedom.
pub trait UnitModel: Send + Sync {
    /// Local name, e.g. `stage[1]`.
    fn name(&self) -> &str;

    fn block(&self) -> BlockId;

    fn inlets(&self) -> &[NamedState];

    fn outlets(&self) -> &[NamedState];

    fn port(&self, name: &str) -> Option<&StateBlock> {
        self.inlets()
            .iter()
            .chain(self.outlets())
            .find(|p| p.port == name)
            .map(|p| &p.state)
    }

    /// Write first estimates of internal and outlet variables from the
    /// current inlet values.
    fn estimate(&self, model: &mut Model) -> UnitResult<()>;

    /// Hold the inlets, estimate, solve the unit block on its own and
    /// release the holds.
    ///
    /// Holds are released whether or not the solve succeeded.
    fn initialize(&self, ctx: &mut InitContext<'_>) -> UnitResult<LocalSolveRecord> {
        debug!(unit = self.name(), "initializing unit");
        let mut held = Vec::with_capacity(self.inlets().len());
        let result = hold_and_solve(self, ctx, &mut held);
        for (inlet, flags) in self.inlets().iter().zip(held).rev() {
            inlet.state.release(ctx.model, ctx.overrides, flags)?;
        }
        result
    }
}

fn hold_and_solve<U: UnitModel + ?Sized>(
    unit: &U,
    ctx: &mut InitContext<'_>,
    held: &mut Vec<InitFlags>,
) -> UnitResult<LocalSolveRecord> {
    let no_args = StateArgs::default();
    for inlet in unit.inlets() {
        held.push(
            inlet
                .state
                .initialize(ctx.model, ctx.overrides, &no_args, true)?,
        );
    }
    unit.estimate(ctx.model)?;
    for outlet in unit.outlets() {
        outlet
            .state
            .initialize(ctx.model, ctx.overrides, &no_args, false)?;
    }
    ctx.solve_local(unit.block())
}
