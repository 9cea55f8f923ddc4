//! Precipitator: removes a fixed fraction of each solute as solids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sf_core::{BlockId, VarId, ensure_fraction};
use sf_model::{Expr, Model};
use sf_props::{PropertyPackage, StateBlock, StateProvider};

use crate::common::{build_ports, check_param, mass_flows, per_component, values_of};
use crate::error::{UnitError, UnitResult};
use crate::traits::{NamedState, UnitModel};

/// Precipitation yields per solute, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrecipitatorParams {
    pub yields: BTreeMap<String, f64>,
}

/// Constraints:
///
/// - `eq_precipitate[j]`: `precipitate[j] = yield[j] * inlet[j]`
/// - `eq_liquor_mass[j]`: `outlet[j] = inlet[j] - precipitate[j]`
/// - `eq_liquor_flow`: solvent passes through
/// - `eq_residence_time`: `residence_time * inlet flow = volume`
#[derive(Debug, Clone)]
pub struct Precipitator {
    name: String,
    block: BlockId,
    inlets: Vec<NamedState>,
    outlets: Vec<NamedState>,
    components: Vec<String>,
    volume: VarId,
    yields: Vec<VarId>,
    precipitate: Vec<VarId>,
    residence_time: VarId,
}

impl Precipitator {
    pub fn build(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        package: &dyn PropertyPackage,
        params: &PrecipitatorParams,
        volume_m3: f64,
    ) -> UnitResult<Self> {
        let block = model.add_block(parent, name)?;
        let path = model.block_path(block).to_string();
        let solutes = package.components();

        let volume = model.add_param(block, "volume", (), check_param(&path, volume_m3, "volume")?)?;
        let mut yields = Vec::with_capacity(solutes.len());
        for j in solutes.iter() {
            let y = per_component(&path, &params.yields, j, "yield")?;
            let y = ensure_fraction(y, "precipitation yield").map_err(|source| {
                UnitError::InvalidParameter {
                    block: path.clone(),
                    source,
                }
            })?;
            yields.push(model.add_param(block, "yield", j, y)?);
        }

        let inlets = build_ports(model, block, package, &["inlet"])?;
        let outlets = build_ports(model, block, package, &["outlet"])?;
        let inlet = &inlets[0].state;
        let outlet = &outlets[0].state;
        let in_mass = mass_flows(model, inlet)?;
        let out_mass = mass_flows(model, outlet)?;

        let residence_time = model.add_var(block, "residence_time", (), 1.0)?;
        model.set_bounds(residence_time, Some(0.0), None)?;
        model.add_constraint(
            block,
            "eq_residence_time",
            (),
            Expr::Var(residence_time) * inlet.flow_vol(),
            Expr::Var(volume),
        )?;
        model.add_constraint(
            block,
            "eq_liquor_flow",
            (),
            Expr::Var(outlet.flow_vol()),
            Expr::Var(inlet.flow_vol()),
        )?;

        let mut precipitate = Vec::with_capacity(solutes.len());
        for (i, j) in solutes.iter().enumerate() {
            let solid = model.add_var(block, "precipitate", j, 0.0)?;
            model.set_bounds(solid, Some(0.0), None)?;
            model.add_constraint(
                block,
                "eq_precipitate",
                j,
                Expr::Var(solid),
                Expr::Var(yields[i]) * in_mass[i],
            )?;
            model.add_constraint(
                block,
                "eq_liquor_mass",
                j,
                Expr::Var(out_mass[i]),
                Expr::Var(in_mass[i]) - solid,
            )?;
            precipitate.push(solid);
        }

        Ok(Self {
            name: name.to_string(),
            block,
            inlets,
            outlets,
            components: solutes.names().to_vec(),
            volume,
            yields,
            precipitate,
            residence_time,
        })
    }

    pub fn inlet(&self) -> &StateBlock {
        &self.inlets[0].state
    }

    pub fn outlet(&self) -> &StateBlock {
        &self.outlets[0].state
    }

    pub fn volume(&self) -> VarId {
        self.volume
    }

    pub fn residence_time(&self) -> VarId {
        self.residence_time
    }

    /// Precipitated mass flow of `solute`.
    pub fn precipitate(&self, solute: &str) -> Option<VarId> {
        let i = self.components.iter().position(|c| c == solute)?;
        Some(self.precipitate[i])
    }
}

impl UnitModel for Precipitator {
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
        &self.outlets
    }

    fn estimate(&self, model: &mut Model) -> UnitResult<()> {
        let flow = model.value(self.inlet().flow_vol())?;
        let volume = model.value(self.volume)?;
        if flow > 0.0 {
            model.set_value(self.residence_time, volume / flow)?;
        }
        model.set_value(self.outlet().flow_vol(), flow)?;

        let in_mass = values_of(model, &mass_flows(model, self.inlet())?)?;
        let yields = values_of(model, &self.yields)?;
        let out_mass = mass_flows(model, self.outlet())?;
        for i in 0..in_mass.len() {
            let solid = yields[i] * in_mass[i];
            model.set_value(self.precipitate[i], solid)?;
            model.set_value(out_mass[i], in_mass[i] - solid)?;
        }
        Ok(())
    }
}
