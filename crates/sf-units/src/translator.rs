//! Translator bridge between two property representations.
//!
//! Carries volumetric flow and the shared metal concentrations across
//! unchanged, and pins the downstream-only species to reference values:
//! water to a saturation level and acid species to a negligible
//! concentration. Every constraint determines exactly one downstream
//! variable, so the bridge adds no degrees of freedom.

use serde::{Deserialize, Serialize};
use sf_core::{BlockId, VarId, m3ph, mg_per_l};
use sf_model::{Expr, Model};
use sf_props::{LEACH_ACIDS, PropertyPackage, SX_METALS, StateBlock, StateProvider, WATER};

use crate::common::{build_ports, check_param};
use crate::error::{UnitError, UnitResult};
use crate::traits::{NamedState, UnitModel};

/// Which species are carried across and which are pinned, with the
/// reference concentrations in mg/L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Species copied from upstream to downstream.
    pub metals: Vec<String>,
    /// Downstream-only species pinned to `acid_conc_mg_per_l`.
    pub acids: Vec<String>,
    /// Solvent species pinned to `water_conc_mg_per_l`.
    pub water: String,
    pub water_conc_mg_per_l: f64,
    pub acid_conc_mg_per_l: f64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            metals: SX_METALS.iter().map(|s| s.to_string()).collect(),
            acids: LEACH_ACIDS.iter().map(|s| s.to_string()).collect(),
            water: WATER.to_string(),
            water_conc_mg_per_l: 1.0e6,
            acid_conc_mg_per_l: 1.0e-10,
        }
    }
}

/// Concentration pinned to a reference value.
#[derive(Debug, Clone, Copy)]
struct Pinned {
    var: VarId,
    value: f64,
}

#[derive(Debug, Clone)]
pub struct Translator {
    name: String,
    block: BlockId,
    inlets: Vec<NamedState>,
    outlets: Vec<NamedState>,
    flow_factor: f64,
    conc_factor: f64,
    /// (upstream, downstream) concentration pairs.
    carried: Vec<(VarId, VarId)>,
    pinned: Vec<Pinned>,
}

impl Translator {
    pub fn build(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        upstream: &dyn PropertyPackage,
        downstream: &dyn PropertyPackage,
        config: &TranslatorConfig,
    ) -> UnitResult<Self> {
        let block = model.add_block(parent, name)?;
        let path = model.block_path(block).to_string();
        check_mapping(&path, upstream, downstream, config)?;
        let water_ref = check_param(&path, config.water_conc_mg_per_l, "water reference")?;
        let acid_ref = check_param(&path, config.acid_conc_mg_per_l, "acid reference")?;

        let inlets = build_ports(model, block, upstream, &["inlet"])?;
        let outlets = build_ports(model, block, downstream, &["outlet"])?;
        let inlet = &inlets[0].state;
        let outlet = &outlets[0].state;

        // Same physical quantity in each side's units.
        let up_units = upstream.units();
        let down_units = downstream.units();
        let flow_factor = down_units.flow(m3ph(1.0)) / up_units.flow(m3ph(1.0));
        let conc_factor = down_units.conc(mg_per_l(1.0)) / up_units.conc(mg_per_l(1.0));

        model.add_constraint(
            block,
            "eq_flow_vol",
            (),
            Expr::Var(outlet.flow_vol()),
            Expr::Var(inlet.flow_vol()) * flow_factor,
        )?;

        let mut carried = Vec::with_capacity(config.metals.len());
        for metal in &config.metals {
            let (up, down) = match (inlet.conc_mass_comp(metal), outlet.conc_mass_comp(metal)) {
                (Some(up), Some(down)) => (up, down),
                _ => {
                    return Err(UnitError::IncompatibleSolutes {
                        block: path,
                        reason: format!("no concentration for '{metal}' on both sides"),
                    });
                }
            };
            model.add_constraint(
                block,
                "eq_conc_mass_metals",
                metal,
                Expr::Var(down),
                Expr::Var(up) * conc_factor,
            )?;
            carried.push((up, down));
        }

        let mut pinned = Vec::with_capacity(config.acids.len() + 1);
        let water_value = down_units.conc(mg_per_l(water_ref));
        let water = pinned_var(&path, outlet, &config.water)?;
        model.add_constraint(block, "eq_conc_mass_water", (), Expr::Var(water), water_value)?;
        pinned.push(Pinned {
            var: water,
            value: water_value,
        });

        let acid_value = down_units.conc(mg_per_l(acid_ref));
        for acid in &config.acids {
            let var = pinned_var(&path, outlet, acid)?;
            model.add_constraint(block, "eq_conc_mass_acids", acid, Expr::Var(var), acid_value)?;
            pinned.push(Pinned {
                var,
                value: acid_value,
            });
        }

        Ok(Self {
            name: name.to_string(),
            block,
            inlets,
            outlets,
            flow_factor,
            conc_factor,
            carried,
            pinned,
        })
    }

    pub fn inlet(&self) -> &StateBlock {
        &self.inlets[0].state
    }

    pub fn outlet(&self) -> &StateBlock {
        &self.outlets[0].state
    }
}

fn pinned_var(block: &str, outlet: &StateBlock, species: &str) -> UnitResult<VarId> {
    outlet
        .conc_mass_comp(species)
        .ok_or_else(|| UnitError::IncompatibleSolutes {
            block: block.to_string(),
            reason: format!("downstream package '{}' lacks '{species}'", outlet.package()),
        })
}

/// Every carried species must exist on both sides and every downstream
/// species must be either carried or pinned.
fn check_mapping(
    block: &str,
    upstream: &dyn PropertyPackage,
    downstream: &dyn PropertyPackage,
    config: &TranslatorConfig,
) -> UnitResult<()> {
    let incompatible = |reason: String| UnitError::IncompatibleSolutes {
        block: block.to_string(),
        reason,
    };
    let up = upstream.components();
    let down = downstream.components();

    if up.intersection(down).next().is_none() {
        return Err(incompatible(format!(
            "'{}' and '{}' share no components",
            upstream.name(),
            downstream.name()
        )));
    }
    for metal in &config.metals {
        if !up.contains(metal) {
            return Err(incompatible(format!(
                "'{metal}' is missing upstream ('{}')",
                upstream.name()
            )));
        }
        if !down.contains(metal) {
            return Err(incompatible(format!(
                "'{metal}' is missing downstream ('{}')",
                downstream.name()
            )));
        }
    }
    for species in down.iter() {
        let mapped = config.metals.iter().any(|m| m == species)
            || config.acids.iter().any(|a| a == species)
            || config.water == species;
        if !mapped {
            return Err(incompatible(format!(
                "downstream '{species}' has no upstream source or reference value"
            )));
        }
    }
    Ok(())
}

impl UnitModel for Translator {
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
        model.set_value(self.outlet().flow_vol(), flow * self.flow_factor)?;
        for &(up, down) in &self.carried {
            let c = model.value(up)?;
            model.set_value(down, c * self.conc_factor)?;
        }
        for p in &self.pinned {
            model.set_value(p.var, p.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_props::{AqueousPackage, SoluteSet, leach_solution_package, sx_aqueous_package};

    #[test]
    fn default_config_has_references() {
        let c = TranslatorConfig::default();
        assert_eq!(c.metals.len(), 12);
        assert_eq!(c.acids, vec!["H", "HSO4", "SO4"]);
        assert_eq!(c.water_conc_mg_per_l, 1.0e6);
        assert_eq!(c.acid_conc_mg_per_l, 1.0e-10);
    }

    #[test]
    fn adds_no_degrees_of_freedom() {
        let mut m = Model::new("fs");
        let root = m.root();
        let sx = sx_aqueous_package().unwrap();
        let leach = leach_solution_package().unwrap();
        let t = Translator::build(&mut m, root, "translator", &sx, &leach, &TranslatorConfig::default())
            .unwrap();
        for v in t.inlet().state_vars() {
            m.fix_current(v).unwrap();
        }
        // 1 flow + 12 metals + water + 3 acids
        assert_eq!(m.active_constraints(sf_model::Scope::Block(t.block())).len(), 17);
        assert_eq!(m.degrees_of_freedom(sf_model::Scope::Block(t.block())), 0);
    }

    #[test]
    fn unmapped_downstream_species_rejected() {
        let mut m = Model::new("fs");
        let root = m.root();
        let sx = sx_aqueous_package().unwrap();
        let down = AqueousPackage::new(
            "other",
            SoluteSet::new(["H2O", "Nd", "Cl"]).unwrap(),
        );
        let config = TranslatorConfig {
            metals: vec!["Nd".into()],
            ..TranslatorConfig::default()
        };
        let err = Translator::build(&mut m, root, "translator", &sx, &down, &config).unwrap_err();
        assert!(matches!(err, UnitError::IncompatibleSolutes { .. }));
        assert!(err.to_string().contains("Cl"));
    }
}
