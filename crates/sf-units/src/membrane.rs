//! Diafiltration membrane stage discretized into tube elements.
//!
//! The stage length is split into `tubes` equal elements. Solvent permeates
//! at a constant rate per unit length; each solute passes the membrane with
//! a permeate concentration equal to its sieving coefficient times the local
//! retentate concentration. Per element `t` and solute `j`:
//!
//! ```text
//! Q_p[t] * tubes      = flux * length
//! Q_r[t]              = Q_r[t-1] - Q_p[t]
//! M_r[t,j]            = M_r[t-1,j] - M_p[t,j]
//! M_p[t,j] * Q_r[t]   = S[j] * M_r[t,j] * Q_p[t]
//! ```
//!
//! Element 0 is the stage inlet. The permeate outlet collects every element,
//! the retentate outlet is the last element.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sf_core::{BlockId, Length, VarId, to_m};
use sf_model::{Expr, Model};
use sf_props::{PropertyPackage, StateBlock, StateProvider};
use tracing::warn;

use crate::common::{build_ports, check_param, mass_flows, per_component, values_of};
use crate::error::{UnitError, UnitResult};
use crate::traits::{NamedState, UnitModel};

/// Membrane parameters shared by every stage of a cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembraneParams {
    /// Solvent flux per metre of membrane, m³/h/m.
    pub flux: f64,
    /// Sieving coefficient per solute.
    pub sieving: BTreeMap<String, f64>,
}

/// Per-element variables of one stage.
#[derive(Debug, Clone)]
struct Element {
    flow_permeate: VarId,
    flow_retentate: VarId,
    mass_permeate: Vec<VarId>,
    mass_retentate: Vec<VarId>,
}

#[derive(Debug, Clone)]
pub struct MembraneStage {
    name: String,
    block: BlockId,
    inlets: Vec<NamedState>,
    outlets: Vec<NamedState>,
    flux: VarId,
    length: VarId,
    sieving: Vec<VarId>,
    elements: Vec<Element>,
}

impl MembraneStage {
    pub fn build(
        model: &mut Model,
        parent: BlockId,
        name: &str,
        package: &dyn PropertyPackage,
        params: &MembraneParams,
        length: Length,
        tubes: usize,
    ) -> UnitResult<Self> {
        let block = model.add_block(parent, name)?;
        let path = model.block_path(block).to_string();
        if tubes == 0 {
            return Err(UnitError::MissingParameter {
                block: path,
                what: "at least one tube element".to_string(),
            });
        }
        let flux_value = check_param(&path, params.flux, "membrane flux")?;
        let length_value = check_param(&path, to_m(length), "membrane length")?;
        let solutes = package.components();

        let flux = model.add_param(block, "flux", (), flux_value)?;
        let length = model.add_param(block, "length", (), length_value)?;
        let mut sieving = Vec::with_capacity(solutes.len());
        for j in solutes.iter() {
            let s = per_component(&path, &params.sieving, j, "sieving coefficient")?;
            let s = check_param(&path, s, "sieving coefficient")?;
            sieving.push(model.add_param(block, "sieving_coefficient", j, s)?);
        }

        let inlets = build_ports(model, block, package, &["inlet"])?;
        let outlets = build_ports(model, block, package, &["permeate", "retentate"])?;
        let inlet = &inlets[0].state;
        let permeate = &outlets[0].state;
        let retentate = &outlets[1].state;

        let mut elements: Vec<Element> = Vec::with_capacity(tubes);
        for t in 1..=tubes {
            let flow_permeate = model.add_var(block, "flow_vol_permeate", t, 0.0)?;
            let flow_retentate = model.add_var(block, "flow_vol_retentate", t, 0.0)?;
            model.set_bounds(flow_permeate, Some(0.0), None)?;
            model.set_bounds(flow_retentate, Some(0.0), None)?;
            let mut mass_permeate = Vec::with_capacity(solutes.len());
            let mut mass_retentate = Vec::with_capacity(solutes.len());
            for j in solutes.iter() {
                let mp = model.add_var(block, "flow_mass_permeate", (t, j), 0.0)?;
                let mr = model.add_var(block, "flow_mass_retentate", (t, j), 0.0)?;
                model.set_bounds(mp, Some(0.0), None)?;
                model.set_bounds(mr, Some(0.0), None)?;
                mass_permeate.push(mp);
                mass_retentate.push(mr);
            }

            let (prev_flow, prev_mass) = match elements.last() {
                Some(e) => (e.flow_retentate, e.mass_retentate.clone()),
                None => (inlet.flow_vol(), mass_flows(model, inlet)?),
            };

            model.add_constraint(
                block,
                "eq_permeate_flow",
                t,
                Expr::Var(flow_permeate) * tubes as f64,
                Expr::Var(flux) * length,
            )?;
            model.add_constraint(
                block,
                "eq_retentate_flow",
                t,
                Expr::Var(flow_retentate),
                Expr::Var(prev_flow) - flow_permeate,
            )?;
            for (i, j) in solutes.iter().enumerate() {
                model.add_constraint(
                    block,
                    "eq_retentate_mass",
                    (t, j),
                    Expr::Var(mass_retentate[i]),
                    Expr::Var(prev_mass[i]) - mass_permeate[i],
                )?;
                model.add_constraint(
                    block,
                    "eq_sieving",
                    (t, j),
                    Expr::Var(mass_permeate[i]) * flow_retentate,
                    Expr::Var(sieving[i]) * mass_retentate[i] * flow_permeate,
                )?;
            }

            elements.push(Element {
                flow_permeate,
                flow_retentate,
                mass_permeate,
                mass_retentate,
            });
        }

        // Outlets.
        let perm_mass = mass_flows(model, permeate)?;
        let ret_mass = mass_flows(model, retentate)?;
        model.add_constraint(
            block,
            "eq_permeate_outlet_flow",
            (),
            Expr::Var(permeate.flow_vol()),
            Expr::sum(elements.iter().map(|e| e.flow_permeate)),
        )?;
        let last = &elements[elements.len() - 1];
        model.add_constraint(
            block,
            "eq_retentate_outlet_flow",
            (),
            Expr::Var(retentate.flow_vol()),
            Expr::Var(last.flow_retentate),
        )?;
        for (i, j) in solutes.iter().enumerate() {
            model.add_constraint(
                block,
                "eq_permeate_outlet_mass",
                j,
                Expr::Var(perm_mass[i]),
                Expr::sum(elements.iter().map(|e| e.mass_permeate[i])),
            )?;
            model.add_constraint(
                block,
                "eq_retentate_outlet_mass",
                j,
                Expr::Var(ret_mass[i]),
                Expr::Var(last.mass_retentate[i]),
            )?;
        }

        Ok(Self {
            name: name.to_string(),
            block,
            inlets,
            outlets,
            flux,
            length,
            sieving,
            elements,
        })
    }

    pub fn inlet(&self) -> &StateBlock {
        &self.inlets[0].state
    }

    pub fn permeate(&self) -> &StateBlock {
        &self.outlets[0].state
    }

    pub fn retentate(&self) -> &StateBlock {
        &self.outlets[1].state
    }

    pub fn tubes(&self) -> usize {
        self.elements.len()
    }

    pub fn flux(&self) -> VarId {
        self.flux
    }

    pub fn length(&self) -> VarId {
        self.length
    }
}

impl UnitModel for MembraneStage {
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

    /// March down the elements with the closed-form element solution.
    fn estimate(&self, model: &mut Model) -> UnitResult<()> {
        let tubes = self.elements.len() as f64;
        let q_p = model.value(self.flux)? * model.value(self.length)? / tubes;
        let sieving = values_of(model, &self.sieving)?;
        let mut q_prev = model.value(self.inlet().flow_vol())?;
        let mut m_prev = values_of(model, &mass_flows(model, self.inlet())?)?;

        let mut q_perm_total = 0.0;
        let mut m_perm_total = vec![0.0; m_prev.len()];
        for e in &self.elements {
            let q_r = q_prev - q_p;
            if q_r <= 0.0 {
                warn!(
                    unit = %self.name,
                    inlet_flow = q_prev,
                    permeate_flow = q_p,
                    "element permeates more solvent than it receives"
                );
            }
            model.set_value(e.flow_permeate, q_p)?;
            model.set_value(e.flow_retentate, q_r.max(0.0))?;
            for (i, &s) in sieving.iter().enumerate() {
                let denom = q_r.max(0.0) + s * q_p;
                let m_p = if denom > 0.0 {
                    s * m_prev[i] * q_p / denom
                } else {
                    0.0
                };
                let m_r = m_prev[i] - m_p;
                model.set_value(e.mass_permeate[i], m_p)?;
                model.set_value(e.mass_retentate[i], m_r)?;
                m_perm_total[i] += m_p;
                m_prev[i] = m_r;
            }
            q_perm_total += q_p;
            q_prev = q_r.max(0.0);
        }

        model.set_value(self.permeate().flow_vol(), q_perm_total)?;
        model.set_value(self.retentate().flow_vol(), q_prev)?;
        let perm_mass = mass_flows(model, self.permeate())?;
        let ret_mass = mass_flows(model, self.retentate())?;
        for i in 0..perm_mass.len() {
            model.set_value(perm_mass[i], m_perm_total[i])?;
            model.set_value(ret_mass[i], m_prev[i])?;
        }
        Ok(())
    }
}
