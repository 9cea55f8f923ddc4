//! The algebraic model: a block tree of variables and equality constraints.

use std::collections::{BTreeMap, BTreeSet};

use sf_core::{BlockId, ConId, VarId, ensure_finite};

use crate::error::{ModelError, ModelResult};
use crate::expr::Expr;
use crate::index::Index;

/// A named node in the block tree (flowsheet, unit, state block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub parent: Option<BlockId>,
    /// Fully qualified name, e.g. `fs.stage[1].properties_in`.
    pub path: String,
}

/// Variable metadata. Values and fixed flags live in the model's flat
/// vectors so expressions evaluate against a single slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: VarId,
    pub block: BlockId,
    pub name: String,
    pub index: Index,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Lookup key for a constraint: owning block, family name, index tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintKey {
    pub block: BlockId,
    pub name: String,
    pub index: Index,
}

/// Equality constraint `lhs == rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub id: ConId,
    pub key: ConstraintKey,
    pub lhs: Expr,
    pub rhs: Expr,
    active: bool,
    vars: Vec<VarId>,
}

impl Constraint {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Variables referenced by either side, sorted.
    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }

    /// `lhs - rhs` evaluated at `values`.
    pub fn residual(&self, values: &[f64]) -> f64 {
        self.lhs.eval(values) - self.rhs.eval(values)
    }
}

/// Equation-oriented model.
///
/// Created once by the flowsheet builder, then mutated in place by the
/// initializer and the solver. Nothing is ever removed.
#[derive(Debug, Clone)]
pub struct Model {
    blocks: Vec<Block>,
    block_paths: BTreeMap<String, BlockId>,
    vars: Vec<Variable>,
    var_keys: BTreeMap<(BlockId, String, Index), VarId>,
    values: Vec<f64>,
    fixed: Vec<bool>,
    constraints: Vec<Constraint>,
    constraint_keys: BTreeMap<ConstraintKey, ConId>,
}

impl Model {
    /// Create a model with a single root block.
    pub fn new(root_name: impl Into<String>) -> Self {
        let name = root_name.into();
        let root = Block {
            id: BlockId::from_index(0),
            name: name.clone(),
            parent: None,
            path: name.clone(),
        };
        let mut block_paths = BTreeMap::new();
        block_paths.insert(name, root.id);
        Self {
            blocks: vec![root],
            block_paths,
            vars: Vec::new(),
            var_keys: BTreeMap::new(),
            values: Vec::new(),
            fixed: Vec::new(),
            constraints: Vec::new(),
            constraint_keys: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> BlockId {
        BlockId::from_index(0)
    }

    // ------------------------------------------------------------------
    // Blocks

    pub fn add_block(&mut self, parent: BlockId, name: impl Into<String>) -> ModelResult<BlockId> {
        let name = name.into();
        let parent_path = &self.block(parent)?.path;
        let path = format!("{parent_path}.{name}");
        if self.block_paths.contains_key(&path) {
            return Err(ModelError::DuplicateBlock { path });
        }
        let id = BlockId::from_slot(self.blocks.len());
        self.block_paths.insert(path.clone(), id);
        self.blocks.push(Block {
            id,
            name,
            parent: Some(parent),
            path,
        });
        Ok(id)
    }

    pub fn block(&self, id: BlockId) -> ModelResult<&Block> {
        self.blocks.get(id.slot()).ok_or(ModelError::UnknownBlock(id))
    }

    pub fn block_by_path(&self, path: &str) -> Option<BlockId> {
        self.block_paths.get(path).copied()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Fully qualified block name, or `?` for an unknown id.
    pub fn block_path(&self, id: BlockId) -> &str {
        self.blocks.get(id.slot()).map_or("?", |b| b.path.as_str())
    }

    /// True when `block` is `ancestor` or one of its descendants.
    pub fn is_within(&self, block: BlockId, ancestor: BlockId) -> bool {
        let mut cursor = Some(block);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.blocks.get(id.slot()).and_then(|b| b.parent);
        }
        false
    }

    // ------------------------------------------------------------------
    // Variables

    /// Add a free variable with an initial value.
    pub fn add_var(
        &mut self,
        block: BlockId,
        name: impl Into<String>,
        index: impl Into<Index>,
        value: f64,
    ) -> ModelResult<VarId> {
        self.block(block)?;
        let name = name.into();
        let index = index.into();
        let value = ensure_finite(value, "initial value").map_err(|source| {
            ModelError::InvalidValue {
                name: format!("{}.{}{}", self.block_path(block), name, index),
                source,
            }
        })?;
        let key = (block, name.clone(), index.clone());
        if self.var_keys.contains_key(&key) {
            return Err(ModelError::DuplicateVariable {
                key: format!("{}.{}{}", self.block_path(block), name, index),
            });
        }
        let id = VarId::from_slot(self.vars.len());
        self.var_keys.insert(key, id);
        self.vars.push(Variable {
            id,
            block,
            name,
            index,
            lower: None,
            upper: None,
        });
        self.values.push(value);
        self.fixed.push(false);
        Ok(id)
    }

    /// Add a parameter: a variable that is fixed from the start.
    pub fn add_param(
        &mut self,
        block: BlockId,
        name: impl Into<String>,
        index: impl Into<Index>,
        value: f64,
    ) -> ModelResult<VarId> {
        let id = self.add_var(block, name, index, value)?;
        self.fixed[id.slot()] = true;
        Ok(id)
    }

    pub fn var(&self, id: VarId) -> ModelResult<&Variable> {
        self.vars.get(id.slot()).ok_or(ModelError::UnknownVar(id))
    }

    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    pub fn find_var(&self, block: BlockId, name: &str, index: impl Into<Index>) -> Option<VarId> {
        self.var_keys
            .get(&(block, name.to_string(), index.into()))
            .copied()
    }

    /// Fully qualified variable name, e.g. `fs.feed.outlet.flow_vol`.
    pub fn var_label(&self, id: VarId) -> String {
        match self.vars.get(id.slot()) {
            Some(v) => format!("{}.{}{}", self.block_path(v.block), v.name, v.index),
            None => format!("<unknown var {id}>"),
        }
    }

    pub fn set_bounds(
        &mut self,
        id: VarId,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> ModelResult<()> {
        let var = self.vars.get_mut(id.slot()).ok_or(ModelError::UnknownVar(id))?;
        var.lower = lower;
        var.upper = upper;
        Ok(())
    }

    pub fn value(&self, id: VarId) -> ModelResult<f64> {
        self.values
            .get(id.slot())
            .copied()
            .ok_or(ModelError::UnknownVar(id))
    }

    /// All variable values, indexed by variable slot.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn set_value(&mut self, id: VarId, value: f64) -> ModelResult<()> {
        let value = ensure_finite(value, "value").map_err(|source| ModelError::InvalidValue {
            name: self.var_label(id),
            source,
        })?;
        let slot = self
            .values
            .get_mut(id.slot())
            .ok_or(ModelError::UnknownVar(id))?;
        *slot = value;
        Ok(())
    }

    pub fn is_fixed(&self, id: VarId) -> ModelResult<bool> {
        self.fixed
            .get(id.slot())
            .copied()
            .ok_or(ModelError::UnknownVar(id))
    }

    /// Fix a variable at `value`.
    pub fn fix(&mut self, id: VarId, value: f64) -> ModelResult<()> {
        self.set_value(id, value)?;
        self.fixed[id.slot()] = true;
        Ok(())
    }

    /// Fix a variable at its current value.
    pub fn fix_current(&mut self, id: VarId) -> ModelResult<()> {
        let flag = self
            .fixed
            .get_mut(id.slot())
            .ok_or(ModelError::UnknownVar(id))?;
        *flag = true;
        Ok(())
    }

    pub fn unfix(&mut self, id: VarId) -> ModelResult<()> {
        let flag = self
            .fixed
            .get_mut(id.slot())
            .ok_or(ModelError::UnknownVar(id))?;
        *flag = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Constraints

    /// Add the equality constraint `lhs == rhs` under `(block, name, index)`.
    pub fn add_constraint(
        &mut self,
        block: BlockId,
        name: impl Into<String>,
        index: impl Into<Index>,
        lhs: impl Into<Expr>,
        rhs: impl Into<Expr>,
    ) -> ModelResult<ConId> {
        self.block(block)?;
        let key = ConstraintKey {
            block,
            name: name.into(),
            index: index.into(),
        };
        if self.constraint_keys.contains_key(&key) {
            return Err(ModelError::DuplicateConstraint {
                key: self.key_label(&key),
            });
        }

        let lhs = lhs.into();
        let rhs = rhs.into();
        let mut vars = BTreeSet::new();
        lhs.collect_vars(&mut vars);
        rhs.collect_vars(&mut vars);
        if let Some(&var) = vars.iter().find(|v| v.slot() >= self.vars.len()) {
            return Err(ModelError::DanglingReference {
                key: self.key_label(&key),
                var,
            });
        }

        let id = ConId::from_slot(self.constraints.len());
        self.constraint_keys.insert(key.clone(), id);
        self.constraints.push(Constraint {
            id,
            key,
            lhs,
            rhs,
            active: true,
            vars: vars.into_iter().collect(),
        });
        Ok(id)
    }

    pub fn constraint(&self, id: ConId) -> ModelResult<&Constraint> {
        self.constraints
            .get(id.slot())
            .ok_or(ModelError::UnknownConstraint(id))
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn find_constraint(
        &self,
        block: BlockId,
        name: &str,
        index: impl Into<Index>,
    ) -> Option<&Constraint> {
        let key = ConstraintKey {
            block,
            name: name.to_string(),
            index: index.into(),
        };
        self.constraint_keys
            .get(&key)
            .and_then(|id| self.constraints.get(id.slot()))
    }

    /// Constraints of one block (not descendants), in key order.
    pub fn block_constraints(&self, block: BlockId) -> impl Iterator<Item = &Constraint> + '_ {
        self.constraint_keys
            .iter()
            .filter(move |(key, _)| key.block == block)
            .map(|(_, id)| &self.constraints[id.slot()])
    }

    pub fn set_active(&mut self, id: ConId, active: bool) -> ModelResult<()> {
        let con = self
            .constraints
            .get_mut(id.slot())
            .ok_or(ModelError::UnknownConstraint(id))?;
        con.active = active;
        Ok(())
    }

    pub fn residual(&self, id: ConId) -> ModelResult<f64> {
        Ok(self.constraint(id)?.residual(&self.values))
    }

    pub fn constraint_label(&self, id: ConId) -> String {
        match self.constraints.get(id.slot()) {
            Some(con) => self.key_label(&con.key),
            None => format!("<unknown constraint {id}>"),
        }
    }

    fn key_label(&self, key: &ConstraintKey) -> String {
        format!("{}.{}{}", self.block_path(key.block), key.name, key.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_paths_nest() {
        let mut m = Model::new("fs");
        let stage = m.add_block(m.root(), "stage[1]").unwrap();
        let props = m.add_block(stage, "properties_in").unwrap();
        assert_eq!(m.block_path(props), "fs.stage[1].properties_in");
        assert!(m.is_within(props, stage));
        assert!(m.is_within(props, m.root()));
        assert!(!m.is_within(stage, props));
        assert_eq!(m.block_by_path("fs.stage[1]"), Some(stage));
    }

    #[test]
    fn duplicate_block_rejected() {
        let mut m = Model::new("fs");
        m.add_block(m.root(), "mixer").unwrap();
        let err = m.add_block(m.root(), "mixer").unwrap_err();
        assert!(matches!(err, ModelError::DuplicateBlock { .. }));
    }

    #[test]
    fn fix_and_unfix() {
        let mut m = Model::new("fs");
        let x = m.add_var(m.root(), "x", (), 1.0).unwrap();
        assert!(!m.is_fixed(x).unwrap());
        m.fix(x, 4.0).unwrap();
        assert!(m.is_fixed(x).unwrap());
        assert_eq!(m.value(x).unwrap(), 4.0);
        m.unfix(x).unwrap();
        assert!(!m.is_fixed(x).unwrap());
        assert_eq!(m.value(x).unwrap(), 4.0);
    }

    #[test]
    fn non_finite_value_rejected() {
        let mut m = Model::new("fs");
        let x = m.add_var(m.root(), "x", (), 1.0).unwrap();
        assert!(m.set_value(x, f64::NAN).is_err());
        assert!(m.add_var(m.root(), "y", (), f64::INFINITY).is_err());
    }

    #[test]
    fn constraints_keyed_and_evaluated() {
        let mut m = Model::new("fs");
        let b = m.add_block(m.root(), "stage[1]").unwrap();
        let q = m.add_var(b, "flow", 1, 3.0).unwrap();
        let c = m.add_var(b, "conc", (1, "Li"), 2.0).unwrap();
        let id = m
            .add_constraint(b, "eq_mass", (1, "Li"), Expr::Var(q) * c, 5.0)
            .unwrap();
        assert_eq!(m.constraint_label(id), "fs.stage[1].eq_mass[1,Li]");
        assert!((m.residual(id).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(m.constraint(id).unwrap().vars(), &[q, c]);
        assert!(m.find_constraint(b, "eq_mass", (1, "Li")).is_some());

        let dup = m.add_constraint(b, "eq_mass", (1, "Li"), Expr::Var(q), 0.0);
        assert!(matches!(dup, Err(ModelError::DuplicateConstraint { .. })));
    }

    #[test]
    fn dangling_variable_reference_rejected() {
        let mut m = Model::new("fs");
        let bogus = VarId::from_index(7);
        let err = m
            .add_constraint(m.root(), "eq", (), Expr::Var(bogus), 0.0)
            .unwrap_err();
        assert!(matches!(err, ModelError::DanglingReference { .. }));
    }

    #[test]
    fn var_lookup_by_key() {
        let mut m = Model::new("fs");
        let b = m.add_block(m.root(), "feed").unwrap();
        let v = m.add_var(b, "flow_mass_comp", "Li", 170.0).unwrap();
        assert_eq!(m.find_var(b, "flow_mass_comp", "Li"), Some(v));
        assert_eq!(m.var_label(v), "fs.feed.flow_mass_comp[Li]");
    }

    #[test]
    fn duplicate_variable_key_rejected() {
        let mut m = Model::new("fs");
        let b = m.add_block(m.root(), "feed").unwrap();
        let v = m.add_var(b, "flow_mass_comp", "Li", 170.0).unwrap();
        let err = m.add_param(b, "flow_mass_comp", "Li", 1.0).unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateVariable {
                key: "fs.feed.flow_mass_comp[Li]".into()
            }
        );
        // the original entry survives and nothing was appended
        assert_eq!(m.find_var(b, "flow_mass_comp", "Li"), Some(v));
        assert_eq!(m.variables().len(), 1);
        assert!(m.add_var(b, "flow_mass_comp", "Co", 0.0).is_ok());
    }
}
