//! Degree-of-freedom ledger and model statistics.

use std::collections::BTreeSet;
use std::fmt;

use sf_core::{BlockId, ConId, VarId};

use crate::model::Model;

/// Portion of the model a query or solve applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every constraint in the model.
    All,
    /// Constraints owned by a block or any of its descendants.
    Block(BlockId),
}

impl Model {
    pub fn in_scope(&self, block: BlockId, scope: Scope) -> bool {
        match scope {
            Scope::All => true,
            Scope::Block(root) => self.is_within(block, root),
        }
    }

    /// Active constraints in scope, in creation order.
    pub fn active_constraints(&self, scope: Scope) -> Vec<ConId> {
        self.constraints()
            .iter()
            .filter(|c| c.is_active() && self.in_scope(c.key.block, scope))
            .map(|c| c.id)
            .collect()
    }

    /// Unfixed variables referenced by the active constraints in scope, sorted.
    ///
    /// Variables owned by other blocks count when a scoped constraint uses them.
    pub fn free_variables(&self, scope: Scope) -> Vec<VarId> {
        let fixed = |v: &VarId| self.is_fixed(*v).unwrap_or(true);
        let mut free = BTreeSet::new();
        for con in self.constraints() {
            if con.is_active() && self.in_scope(con.key.block, scope) {
                free.extend(con.vars().iter().filter(|v| !fixed(v)).copied());
            }
        }
        free.into_iter().collect()
    }

    /// Free variables minus active equality constraints in scope.
    pub fn degrees_of_freedom(&self, scope: Scope) -> i64 {
        let vars = self.free_variables(scope).len() as i64;
        let cons = self.active_constraints(scope).len() as i64;
        vars - cons
    }

    pub fn statistics(&self, scope: Scope) -> ModelStatistics {
        let mut referenced = BTreeSet::new();
        let mut constraints = 0;
        let mut active = 0;
        for con in self.constraints() {
            if !self.in_scope(con.key.block, scope) {
                continue;
            }
            constraints += 1;
            if con.is_active() {
                active += 1;
                referenced.extend(con.vars().iter().copied());
            }
        }
        let fixed = referenced
            .iter()
            .filter(|v| self.is_fixed(**v).unwrap_or(false))
            .count();
        ModelStatistics {
            variables: referenced.len(),
            fixed_variables: fixed,
            constraints,
            active_constraints: active,
            degrees_of_freedom: (referenced.len() - fixed) as i64 - active as i64,
        }
    }
}

/// Size summary of a (sub)model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStatistics {
    /// Variables referenced by active constraints.
    pub variables: usize,
    pub fixed_variables: usize,
    pub constraints: usize,
    pub active_constraints: usize,
    pub degrees_of_freedom: i64,
}

impl fmt::Display for ModelStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Statistics")?;
        writeln!(f, "  Degrees of Freedom: {}", self.degrees_of_freedom)?;
        writeln!(
            f,
            "  Variables: {} (Fixed: {})",
            self.variables, self.fixed_variables
        )?;
        write!(
            f,
            "  Constraints: {} (Active: {})",
            self.constraints, self.active_constraints
        )
    }
}
