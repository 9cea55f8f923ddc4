//! Splitter with fixed split fractions.

use sf_core::{BlockId, CoreError, VarId, ensure_fraction};
use sf_model::{Expr, Model};
use sf_props::{PropertyPackage, StateBlock, StateProvider};

use crate::common::{build_ports, mass_flows, values_of};
use crate::error::{UnitError, UnitResult};
use crate::traits::{NamedState, UnitModel};

/// Divides one inlet between its outlets in fixed proportions; composition
/// is unchanged.
#[derive(Debug, Clone)]
pub struct Splitter {
    name: String,
    block: BlockId,
    inlets: Vec<NamedState>,
    outlets: Vec<NamedState>,
    fractions: Vec<VarId>,
}

impl Splitter {
    /// Splitter sending an equal share to each outlet.
    pub fn build_equal(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        package: &dyn PropertyPackage,
        outlet_ports: &[&str],
    ) -> UnitResult<Self> {
        let n = outlet_ports.len().max(1) as f64;
        let fractions = vec![1.0 / n; outlet_ports.len()];
        Self::build(model, parent, name, package, outlet_ports, &fractions)
    }

    /// `fractions[k]` is the share sent to `outlet_ports[k]`; they must sum to one.
    pub fn build(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        package: &dyn PropertyPackage,
        outlet_ports: &[&str],
        fractions: &[f64],
    ) -> UnitResult<Self> {
        let block = model.add_block(parent, name)?;
        let path = model.block_path(block).to_string();
        if outlet_ports.is_empty() || fractions.len() != outlet_ports.len() {
            return Err(UnitError::MissingParameter {
                block: path,
                what: format!(
                    "{} split fractions for {} outlets",
                    fractions.len(),
                    outlet_ports.len()
                ),
            });
        }
        let mut total = 0.0;
        for &f in fractions {
            total += ensure_fraction(f, "split fraction").map_err(|source| {
                UnitError::InvalidParameter {
                    block: path.clone(),
                    source,
                }
            })?;
        }
        if (total - 1.0).abs() > 1e-9 {
            return Err(UnitError::InvalidParameter {
                block: path,
                source: CoreError::InvalidArg {
                    what: "split fractions must sum to 1",
                },
            });
        }

        let inlets = build_ports(model, block, package, &["inlet"])?;
        let outlets = build_ports(model, block, package, outlet_ports)?;
        let inlet = &inlets[0].state;
        let in_mass = mass_flows(model, inlet)?;

        let mut frac_vars = Vec::with_capacity(outlets.len());
        for (k, (outlet, &f)) in outlets.iter().zip(fractions).enumerate() {
            let k = k + 1;
            let frac = model.add_param(block, "split_fraction", k, f)?;
            frac_vars.push(frac);
            let out = &outlet.state;
            model.add_constraint(
                block,
                "eq_split_flow_vol",
                k,
                Expr::Var(out.flow_vol()),
                Expr::Var(frac) * inlet.flow_vol(),
            )?;
            let out_mass = mass_flows(model, out)?;
            for (j, comp) in package.components().iter().enumerate() {
                model.add_constraint(
                    block,
                    "eq_split_flow_mass_comp",
                    (k, comp),
                    Expr::Var(out_mass[j]),
                    Expr::Var(frac) * in_mass[j],
                )?;
            }
        }

        Ok(Self {
            name: name.to_string(),
            block,
            inlets,
            outlets,
            fractions: frac_vars,
        })
    }

    pub fn inlet(&self) -> &StateBlock {
        &self.inlets[0].state
    }
}

impl UnitModel for Splitter {
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
        let inlet = self.inlet();
        let flow = model.value(inlet.flow_vol())?;
        let masses = values_of(model, &mass_flows(model, inlet)?)?;
        for (outlet, &frac) in self.outlets.iter().zip(&self.fractions) {
            let f = model.value(frac)?;
            model.set_value(outlet.state.flow_vol(), f * flow)?;
            for (var, m) in mass_flows(model, &outlet.state)?.into_iter().zip(&masses) {
                model.set_value(var, f * m)?;
            }
        }
        Ok(())
    }
}
