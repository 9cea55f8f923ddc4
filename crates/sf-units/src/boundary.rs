//! Boundary units: sources with a specified state and product sinks.

use sf_core::BlockId;
use sf_model::Model;
use sf_props::{PropertyPackage, StateArgs, StateBlock, StateProvider};

use crate::common::build_ports;
use crate::error::UnitResult;
use crate::traits::{NamedState, UnitModel};

/// Boundary stream entering the flowsheet. Its state is a design
/// specification: fixed once and never released by initialization.
#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    block: BlockId,
    outlets: Vec<NamedState>,
}

impl Source {
    pub fn build(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        package: &dyn PropertyPackage,
    ) -> UnitResult<Self> {
        let block = model.add_block(parent, name)?;
        let outlets = build_ports(model, block, package, &["outlet"])?;
        Ok(Self {
            name: name.to_string(),
            block,
            outlets,
        })
    }

    pub fn outlet(&self) -> &StateBlock {
        &self.outlets[0].state
    }

    /// Fix the outlet state to `args`; unspecified entries keep their current value.
    pub fn fix_state(&self, model: &mut Model, args: &StateArgs) -> UnitResult<()> {
        let outlet = self.outlet();
        let values = outlet.resolve(model, args)?;
        for (var, value) in outlet.state_vars().into_iter().zip(values) {
            model.fix(var, value)?;
        }
        Ok(())
    }
}

impl UnitModel for Source {
    fn name(&self) -> &str {
        &self.name
    }

    fn block(&self) -> BlockId {
        self.block
    }

    fn inlets(&self) -> &[NamedState] {
        &[]
    }

    fn outlets(&self) -> &[NamedState] {
        &self.outlets
    }

    fn estimate(&self, _model: &mut Model) -> UnitResult<()> {
        Ok(())
    }
}

/// Boundary stream leaving the flowsheet.
#[derive(Debug, Clone)]
pub struct Product {
    name: String,
    block: BlockId,
    inlets: Vec<NamedState>,
}

impl Product {
    pub fn build(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        package: &dyn PropertyPackage,
    ) -> UnitResult<Self> {
        let block = model.add_block(parent, name)?;
        let inlets = build_ports(model, block, package, &["inlet"])?;
        Ok(Self {
            name: name.to_string(),
            block,
            inlets,
        })
    }

    pub fn inlet(&self) -> &StateBlock {
        &self.inlets[0].state
    }
}

impl UnitModel for Product {
    fn name(&self) -> &str {
        &self.name
    }

    fn block(&self) -> BlockId {
        self.block
    }

    fn inlets(&self) -> &[NamedState] {
        &self.inlets
    }

    fn outlets(&self) -> &[NamedState] {
        &[]
    }

    fn estimate(&self, _model: &mut Model) -> UnitResult<()> {
        Ok(())
    }
}
