//! State blocks: per-stream property variables with an initialize/release lifecycle.

use std::collections::BTreeMap;

use sf_core::{
    BlockId, Concentration, MassRate, VarId, VolumeRate, ensure_non_negative, to_kg_per_m3,
    to_kgph, to_lph, to_m3ph, to_mg_per_l,
};
use sf_model::{Expr, Mark, Model, OverrideKind, OverrideStack};
use tracing::debug;

use crate::error::{PropsError, PropsResult};
use crate::solutes::SoluteSet;

/// Starting value for volumetric flow before any initialization.
const DEFAULT_FLOW: f64 = 1.0;
const MG_PER_KG: f64 = 1.0e6;

/// Which per-component quantity is a state variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    /// `flow_vol` and `flow_mass_comp[j]`; concentrations are derived.
    MassFlow,
    /// `flow_vol` and `conc_mass_comp[j]`.
    Concentration,
}

/// Engineering units the package's variables are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSet {
    /// m³/h, kg/h, kg/m³
    Process,
    /// L/h, mg/h, mg/L
    Aqueous,
}

impl UnitSet {
    pub fn flow(self, q: VolumeRate) -> f64 {
        match self {
            UnitSet::Process => to_m3ph(q),
            UnitSet::Aqueous => to_lph(q),
        }
    }

    pub fn mass_flow(self, m: MassRate) -> f64 {
        match self {
            UnitSet::Process => to_kgph(m),
            UnitSet::Aqueous => to_kgph(m) * MG_PER_KG,
        }
    }

    pub fn conc(self, c: Concentration) -> f64 {
        match self {
            UnitSet::Process => to_kg_per_m3(c),
            UnitSet::Aqueous => to_mg_per_l(c),
        }
    }

    pub fn flow_label(self) -> &'static str {
        match self {
            UnitSet::Process => "m^3/h",
            UnitSet::Aqueous => "L/h",
        }
    }

    pub fn mass_flow_label(self) -> &'static str {
        match self {
            UnitSet::Process => "kg/h",
            UnitSet::Aqueous => "mg/h",
        }
    }

    pub fn conc_label(self) -> &'static str {
        match self {
            UnitSet::Process => "kg/m^3",
            UnitSet::Aqueous => "mg/L",
        }
    }
}

/// Initial values for a state block.
///
/// Entries left out keep whatever value the model currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateArgs {
    pub flow_vol: Option<VolumeRate>,
    pub flow_mass_comp: BTreeMap<String, MassRate>,
    pub conc_mass_comp: BTreeMap<String, Concentration>,
}

impl StateArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flow_vol(mut self, q: VolumeRate) -> Self {
        self.flow_vol = Some(q);
        self
    }

    pub fn mass_flow(mut self, name: impl Into<String>, m: MassRate) -> Self {
        self.flow_mass_comp.insert(name.into(), m);
        self
    }

    pub fn conc(mut self, name: impl Into<String>, c: Concentration) -> Self {
        self.conc_mass_comp.insert(name.into(), c);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.flow_vol.is_none() && self.flow_mass_comp.is_empty() && self.conc_mass_comp.is_empty()
    }
}

/// Returned by [`StateProvider::initialize`]; hand back to `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitFlags {
    pub mark: Mark,
    /// State variables fixed by the hold.
    pub held: usize,
}

/// Capability interface for a stream's property state.
///
/// Unit models and the flowsheet sequencer only go through these accessors
/// and the initialize/release pair; they never look inside a package.
pub trait StateProvider {
    fn block(&self) -> BlockId;

    fn components(&self) -> &SoluteSet;

    fn flow_vol(&self) -> VarId;

    fn conc_mass_comp(&self, name: &str) -> Option<VarId>;

    /// Only available on mass-flow based states.
    fn flow_mass_comp(&self, name: &str) -> Option<VarId>;

    /// Variables that fully define the state, `flow_vol` first.
    fn state_vars(&self) -> Vec<VarId>;

    /// Values aligned with [`state_vars`](Self::state_vars): taken from
    /// `args` where given, otherwise the model's current values.
    fn resolve(&self, model: &Model, args: &StateArgs) -> PropsResult<Vec<f64>>;

    /// Write initial values, refresh derived quantities and optionally hold
    /// the state variables fixed.
    fn initialize(
        &self,
        model: &mut Model,
        overrides: &mut OverrideStack,
        args: &StateArgs,
        hold_state: bool,
    ) -> PropsResult<InitFlags>;

    /// Undo a hold made by `initialize`.
    fn release(
        &self,
        model: &mut Model,
        overrides: &mut OverrideStack,
        flags: InitFlags,
    ) -> PropsResult<usize> {
        Ok(overrides.release_to(model, flags.mark)?)
    }
}

/// State block produced by a [`PropertyPackage`](crate::PropertyPackage).
#[derive(Debug, Clone)]
pub struct StateBlock {
    block: BlockId,
    package: String,
    components: SoluteSet,
    basis: Basis,
    units: UnitSet,
    flow_vol: VarId,
    flow_mass: Vec<VarId>,
    conc: Vec<VarId>,
}

impl StateBlock {
    pub(crate) fn build(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        package: &str,
        components: &SoluteSet,
        basis: Basis,
        units: UnitSet,
    ) -> PropsResult<Self> {
        let block = model.add_block(parent, name)?;
        let flow_vol = model.add_var(block, "flow_vol", (), DEFAULT_FLOW)?;
        model.set_bounds(flow_vol, Some(0.0), None)?;

        let mut flow_mass = Vec::new();
        let mut conc = Vec::with_capacity(components.len());
        for j in components.iter() {
            let c = model.add_var(block, "conc_mass_comp", j, 0.0)?;
            model.set_bounds(c, Some(0.0), None)?;
            conc.push(c);
            if basis == Basis::MassFlow {
                let f = model.add_var(block, "flow_mass_comp", j, 0.0)?;
                model.set_bounds(f, Some(0.0), None)?;
                model.add_constraint(
                    block,
                    "eq_conc_mass_comp",
                    j,
                    Expr::Var(c) * flow_vol,
                    Expr::Var(f),
                )?;
                flow_mass.push(f);
            }
        }

        Ok(Self {
            block,
            package: package.to_string(),
            components: components.clone(),
            basis,
            units,
            flow_vol,
            flow_mass,
            conc,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn units(&self) -> UnitSet {
        self.units
    }

    /// Per-component state variables in component order.
    pub fn component_vars(&self) -> &[VarId] {
        match self.basis {
            Basis::MassFlow => &self.flow_mass,
            Basis::Concentration => &self.conc,
        }
    }

    /// Mass flow of `name` in package units, derived for concentration based states.
    pub fn mass_flow_value(&self, model: &Model, name: &str) -> PropsResult<f64> {
        let j = self.require(name)?;
        match self.basis {
            Basis::MassFlow => Ok(model.value(self.flow_mass[j])?),
            Basis::Concentration => {
                Ok(model.value(self.conc[j])? * model.value(self.flow_vol)?)
            }
        }
    }

    fn require(&self, name: &str) -> PropsResult<usize> {
        self.components
            .position(name)
            .ok_or_else(|| PropsError::UnknownComponent {
                name: name.to_string(),
                package: self.package.clone(),
            })
    }

    fn checked(&self, what: &str, value: f64) -> PropsResult<f64> {
        ensure_non_negative(value, "state argument").map_err(|source| PropsError::InvalidStateArg {
            what: format!("{}.{}", self.package, what),
            source,
        })
    }

    /// Recompute derived concentrations from the current flows.
    fn refresh_derived(&self, model: &mut Model) -> PropsResult<()> {
        if self.basis != Basis::MassFlow {
            return Ok(());
        }
        let flow = model.value(self.flow_vol)?;
        for (&f, &c) in self.flow_mass.iter().zip(&self.conc) {
            if model.is_fixed(c)? {
                continue;
            }
            let value = if flow > 0.0 {
                model.value(f)? / flow
            } else {
                0.0
            };
            model.set_value(c, value)?;
        }
        Ok(())
    }
}

impl StateProvider for StateBlock {
    fn block(&self) -> BlockId {
        self.block
    }

    fn components(&self) -> &SoluteSet {
        &self.components
    }

    fn flow_vol(&self) -> VarId {
        self.flow_vol
    }

    fn conc_mass_comp(&self, name: &str) -> Option<VarId> {
        self.components.position(name).map(|j| self.conc[j])
    }

    fn flow_mass_comp(&self, name: &str) -> Option<VarId> {
        let j = self.components.position(name)?;
        self.flow_mass.get(j).copied()
    }

    fn state_vars(&self) -> Vec<VarId> {
        std::iter::once(self.flow_vol)
            .chain(self.component_vars().iter().copied())
            .collect()
    }

    fn resolve(&self, model: &Model, args: &StateArgs) -> PropsResult<Vec<f64>> {
        for name in args.flow_mass_comp.keys().chain(args.conc_mass_comp.keys()) {
            self.require(name)?;
        }
        let flow = match args.flow_vol {
            Some(q) => self.checked("flow_vol", self.units.flow(q))?,
            None => model.value(self.flow_vol)?,
        };

        let mut values = Vec::with_capacity(self.components.len() + 1);
        values.push(flow);
        for (j, name) in self.components.iter().enumerate() {
            let mass = args.flow_mass_comp.get(name).map(|m| self.units.mass_flow(*m));
            let conc = args.conc_mass_comp.get(name).map(|c| self.units.conc(*c));
            let value = match self.basis {
                Basis::MassFlow => match (mass, conc) {
                    (Some(m), _) => m,
                    (None, Some(c)) => c * flow,
                    (None, None) => model.value(self.flow_mass[j])?,
                },
                Basis::Concentration => match (conc, mass) {
                    (Some(c), _) => c,
                    (None, Some(m)) if flow > 0.0 => m / flow,
                    (None, Some(_)) => 0.0,
                    (None, None) => model.value(self.conc[j])?,
                },
            };
            values.push(self.checked(name, value)?);
        }
        Ok(values)
    }

    fn initialize(
        &self,
        model: &mut Model,
        overrides: &mut OverrideStack,
        args: &StateArgs,
        hold_state: bool,
    ) -> PropsResult<InitFlags> {
        if !args.is_empty() {
            let values = self.resolve(model, args)?;
            for (var, value) in self.state_vars().into_iter().zip(values) {
                if !model.is_fixed(var)? {
                    model.set_value(var, value)?;
                }
            }
        }
        self.refresh_derived(model)?;

        let mark = overrides.mark();
        let mut held = 0;
        if hold_state {
            for var in self.state_vars() {
                if overrides.hold(model, var, OverrideKind::HoldState)? {
                    held += 1;
                }
            }
        }
        debug!(
            block = model.block_path(self.block),
            held, "state block initialized"
        );
        Ok(InitFlags { mark, held })
    }
}
