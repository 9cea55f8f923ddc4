//! Stack of temporary variable fixes with ordered undo.
//!
//! Initialization fixes inlet and recycle variables so each sub-block can be
//! solved on its own. Every such fix goes through this stack, and releasing
//! pops in reverse order, restoring exactly the fixed flag (and, for
//! variables that were already fixed, the value) seen before the push.

use sf_core::VarId;
use tracing::trace;

use crate::error::ModelResult;
use crate::model::Model;

/// Why a variable was temporarily fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideKind {
    /// Inlet set from an already-initialized upstream outlet.
    Propagated,
    /// Inlet set from an initial guess because its producer is not initialized yet.
    Guess,
    /// State variables held by a state block during its owner's local solve.
    HoldState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub var: VarId,
    pub kind: OverrideKind,
    /// Value to restore when the variable was already fixed before the push.
    previous: Option<f64>,
}

/// Position in the stack; releasing to a mark undoes everything pushed after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mark(usize);

#[derive(Debug, Clone, Default)]
pub struct OverrideStack {
    entries: Vec<Override>,
}

impl OverrideStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix `var` at `value`, remembering how to undo it.
    pub fn push_fix(
        &mut self,
        model: &mut Model,
        var: VarId,
        value: f64,
        kind: OverrideKind,
    ) -> ModelResult<()> {
        let previous = if model.is_fixed(var)? {
            Some(model.value(var)?)
        } else {
            None
        };
        model.fix(var, value)?;
        trace!(var = %model.var_label(var), value, ?kind, "override pushed");
        self.entries.push(Override {
            var,
            kind,
            previous,
        });
        Ok(())
    }

    /// Fix `var` at its current value if it is free. Returns whether a fix was pushed.
    pub fn hold(&mut self, model: &mut Model, var: VarId, kind: OverrideKind) -> ModelResult<bool> {
        if model.is_fixed(var)? {
            return Ok(false);
        }
        model.fix_current(var)?;
        self.entries.push(Override {
            var,
            kind,
            previous: None,
        });
        Ok(true)
    }

    pub fn mark(&self) -> Mark {
        Mark(self.entries.len())
    }

    /// Undo every override pushed after `mark`, newest first.
    pub fn release_to(&mut self, model: &mut Model, mark: Mark) -> ModelResult<usize> {
        let mut released = 0;
        while self.entries.len() > mark.0 {
            let Some(entry) = self.entries.pop() else {
                break;
            };
            match entry.previous {
                Some(value) => model.fix(entry.var, value)?,
                None => model.unfix(entry.var)?,
            }
            released += 1;
        }
        Ok(released)
    }

    pub fn release_all(&mut self, model: &mut Model) -> ModelResult<usize> {
        self.release_to(model, Mark(0))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: OverrideKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Override> {
        self.entries.iter()
    }
}
