//! Mixer: sums solvent and solute flows from any number of inlets.

use sf_core::{BlockId, VarId};
use sf_model::{Expr, Model};
use sf_props::{PropertyPackage, StateBlock, StateProvider};

use crate::common::{build_ports, mass_flows, values_of};
use crate::error::UnitResult;
use crate::traits::{NamedState, UnitModel};

/// Ideal mixer. Constraints: `eq_flow_vol` and `eq_flow_mass_comp[j]`.
#[derive(Debug, Clone)]
pub struct Mixer {
    name: String,
    block: BlockId,
    inlets: Vec<NamedState>,
    outlets: Vec<NamedState>,
}

impl Mixer {
    pub fn build(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        package: &dyn PropertyPackage,
        inlet_ports: &[&str],
    ) -> UnitResult<Self> {
        let block = model.add_block(parent, name)?;
        let inlets = build_ports(model, block, package, inlet_ports)?;
        let outlets = build_ports(model, block, package, &["outlet"])?;
        let out = &outlets[0].state;

        let flows: Vec<VarId> = inlets.iter().map(|p| p.state.flow_vol()).collect();
        model.add_constraint(
            block,
            "eq_flow_vol",
            (),
            Expr::Var(out.flow_vol()),
            Expr::sum(flows),
        )?;

        let out_mass = mass_flows(model, out)?;
        let in_mass = inlets
            .iter()
            .map(|p| mass_flows(model, &p.state))
            .collect::<UnitResult<Vec<_>>>()?;
        for (j, comp) in package.components().iter().enumerate() {
            model.add_constraint(
                block,
                "eq_flow_mass_comp",
                comp,
                Expr::Var(out_mass[j]),
                Expr::sum(in_mass.iter().map(|m| m[j])),
            )?;
        }

        Ok(Self {
            name: name.to_string(),
            block,
            inlets,
            outlets,
        })
    }

    pub fn outlet(&self) -> &StateBlock {
        &self.outlets[0].state
    }
}

impl UnitModel for Mixer {
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
        let out = self.outlet();
        let mut flow = 0.0;
        for p in &self.inlets {
            flow += model.value(p.state.flow_vol())?;
        }
        model.set_value(out.flow_vol(), flow)?;

        let out_mass = mass_flows(model, out)?;
        let mut totals = vec![0.0; out_mass.len()];
        for p in &self.inlets {
            let masses = values_of(model, &mass_flows(model, &p.state)?)?;
            for (t, m) in totals.iter_mut().zip(masses) {
                *t += m;
            }
        }
        for (var, total) in out_mass.into_iter().zip(totals) {
            model.set_value(var, total)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_model::{OverrideStack, Scope};
    use sf_props::{SoluteFlowPackage, SoluteSet};
    use sf_solver::NewtonSolver;

    use crate::traits::InitContext;

    #[test]
    fn mixer_sums_inlets() {
        let pkg = SoluteFlowPackage::new(SoluteSet::new(["Li", "Co"]).unwrap());
        let mut m = Model::new("fs");
        let root = m.root();
        let mixer = Mixer::build(&mut m, root, "mixer[1]", &pkg, &["inlet_1", "inlet_2"]).unwrap();

        let a = mixer.port("inlet_1").unwrap().clone();
        let b = mixer.port("inlet_2").unwrap().clone();
        m.set_value(a.flow_vol(), 100.0).unwrap();
        m.set_value(a.flow_mass_comp("Li").unwrap(), 170.0).unwrap();
        m.set_value(b.flow_vol(), 30.0).unwrap();
        m.set_value(b.flow_mass_comp("Li").unwrap(), 3.0).unwrap();

        let mut stack = OverrideStack::new();
        let solver = NewtonSolver::default();
        let mut ctx = InitContext::new(&mut m, &mut stack, &solver);
        let record = mixer.initialize(&mut ctx).unwrap();
        assert_eq!(record.dof, 0);
        assert_eq!(record.block, "fs.mixer[1]");
        drop(ctx);

        let out = mixer.outlet();
        assert!((m.value(out.flow_vol()).unwrap() - 130.0).abs() < 1e-9);
        assert!((m.value(out.flow_mass_comp("Li").unwrap()).unwrap() - 173.0).abs() < 1e-9);
        let li = out.conc_mass_comp("Li").unwrap();
        assert!((m.value(li).unwrap() - 173.0 / 130.0).abs() < 1e-9);

        // holds released
        assert!(stack.is_empty());
        assert!(!m.is_fixed(a.flow_vol()).unwrap());
        assert!(m.degrees_of_freedom(Scope::Block(mixer.block())) > 0);
    }
}
