//! Flowsheet assembly and global solve orchestration.

use sf_core::{PortId, ensure_non_negative};
use sf_graph::{Side, StreamKind, Topology, UnitKind, build_topology};
use sf_model::{Expr, Index, Model, ModelStatistics, Scope};
use sf_props::{PropertyPackage, SoluteFlowPackage, StateProvider};
use sf_solver::{NewtonSolver, SolveOutcome, Solver};
use sf_units::{MembraneStage, Mixer, Precipitator, Product, Source, Splitter, UnitModel};
use tracing::{debug, info, warn};

use crate::config::CascadeConfig;
use crate::error::{FlowsheetError, FlowsheetResult};
use crate::report::{StreamReport, StreamRow};
use crate::sequencer::{self, InitReport, port_state};

/// An assembled diafiltration cascade.
///
/// Owns the algebraic model, the stage graph it was built from and one unit
/// model per graph unit. Source states are fixed at build time; every other
/// stream is tied to its producer by equality constraints in the root block,
/// so a freshly built flowsheet already has zero degrees of freedom.
pub struct Flowsheet {
    config: CascadeConfig,
    topology: Topology,
    model: Model,
    package: SoluteFlowPackage,
    /// Indexed by graph unit slot.
    units: Vec<Box<dyn UnitModel>>,
    feed: Source,
    precipitators: Vec<(Side, Precipitator)>,
}

impl Flowsheet {
    pub fn build(config: CascadeConfig) -> FlowsheetResult<Self> {
        config.validate()?;
        let topology = build_topology(&config.topology_spec())?;
        let solutes = config.solute_set()?;
        let package = SoluteFlowPackage::new(solutes.clone());
        let membrane = config.membrane();

        let mut model = Model::new("fs");
        let root = model.root();
        let graph = &topology.graph;

        let mut units: Vec<Box<dyn UnitModel>> = Vec::with_capacity(graph.units().len());
        let mut feed = None;
        let mut precipitators = Vec::new();
        for unit in graph.units() {
            let port_names = |ports: &[PortId]| -> Vec<String> {
                ports
                    .iter()
                    .filter_map(|&p| graph.port(p))
                    .map(|p| p.name.clone())
                    .collect()
            };
            let inlet_names = port_names(&unit.inlets);
            let outlet_names = port_names(&unit.outlets);
            let inlet_ports: Vec<&str> = inlet_names.iter().map(String::as_str).collect();
            let outlet_ports: Vec<&str> = outlet_names.iter().map(String::as_str).collect();
            let name = unit.name.as_str();

            let built: Box<dyn UnitModel> = match unit.kind {
                UnitKind::Source => {
                    let source = Source::build(&mut model, root, name, &package)?;
                    let spec = if unit.id == topology.feed {
                        &config.feed
                    } else {
                        &config.diafiltrate
                    };
                    source.fix_state(&mut model, &spec.state_args(&solutes))?;
                    if unit.id == topology.feed {
                        feed = Some(source.clone());
                    }
                    Box::new(source)
                }
                UnitKind::Mixer => {
                    Box::new(Mixer::build(&mut model, root, name, &package, &inlet_ports)?)
                }
                UnitKind::Splitter => Box::new(Splitter::build_equal(
                    &mut model,
                    root,
                    name,
                    &package,
                    &outlet_ports,
                )?),
                UnitKind::Stage => Box::new(MembraneStage::build(
                    &mut model,
                    root,
                    name,
                    &package,
                    &membrane,
                    config.membrane_length(),
                    config.tubes,
                )?),
                UnitKind::Precipitator => {
                    let side = topology
                        .precipitators
                        .iter()
                        .find(|(_, u)| *u == unit.id)
                        .map(|(s, _)| *s)
                        .ok_or_else(|| {
                            FlowsheetError::config(format!("precipitator '{name}' has no side"))
                        })?;
                    let prec = Precipitator::build(
                        &mut model,
                        root,
                        name,
                        &package,
                        &config.yields.params(side),
                        config.precipitator_volume_m3,
                    )?;
                    precipitators.push((side, prec.clone()));
                    Box::new(prec)
                }
                UnitKind::Product => Box::new(Product::build(&mut model, root, name, &package)?),
            };
            units.push(built);
        }

        // Arcs: consumer inlet state equals producer outlet state.
        for stream in graph.streams() {
            let from = port_state(graph, &units, stream.from)?;
            let to = port_state(graph, &units, stream.to)?;
            model.add_constraint(
                root,
                "eq_arc_flow",
                &stream.name,
                Expr::Var(to.flow_vol()),
                Expr::Var(from.flow_vol()),
            )?;
            for j in solutes.iter() {
                let (Some(src), Some(dst)) = (from.flow_mass_comp(j), to.flow_mass_comp(j)) else {
                    return Err(FlowsheetError::config(format!(
                        "stream '{}' has no mass flow for '{j}'",
                        stream.name
                    )));
                };
                model.add_constraint(
                    root,
                    "eq_arc_mass",
                    Index::from(&stream.name).with(j),
                    Expr::Var(dst),
                    Expr::Var(src),
                )?;
            }
        }

        let feed = feed
            .ok_or_else(|| FlowsheetError::config("topology has no feed source"))?;
        let dof = model.degrees_of_freedom(Scope::All);
        info!(
            strategy = %config.mixing,
            stages = config.stages,
            tubes = config.tubes,
            units = units.len(),
            streams = graph.streams().len(),
            dof,
            "flowsheet built"
        );

        Ok(Self {
            config,
            topology,
            model,
            package,
            units,
            feed,
            precipitators,
        })
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn units(&self) -> impl Iterator<Item = &dyn UnitModel> {
        self.units.iter().map(|u| u.as_ref())
    }

    pub fn unit(&self, name: &str) -> Option<&dyn UnitModel> {
        let id = self.topology.graph.unit_by_name(name)?;
        self.units.get(id.slot()).map(|u| u.as_ref())
    }

    pub fn precipitator(&self, side: Side) -> Option<&Precipitator> {
        self.precipitators
            .iter()
            .find(|(s, _)| *s == side)
            .map(|(_, p)| p)
    }

    pub fn degrees_of_freedom(&self) -> i64 {
        self.model.degrees_of_freedom(Scope::All)
    }

    pub fn statistics(&self) -> ModelStatistics {
        self.model.statistics(Scope::All)
    }

    /// Newton solver configured from [`CascadeConfig::solver`].
    pub fn default_solver(&self) -> NewtonSolver {
        NewtonSolver::new(self.config.solver.clone())
    }

    /// Pass 1 and Pass 2 of initialization.
    pub fn initialize(&mut self, solver: &dyn Solver) -> FlowsheetResult<InitReport> {
        let guess = self.config.guess().state_args(self.package.components());
        sequencer::run(
            &mut self.model,
            &self.topology.graph,
            &self.units,
            &guess,
            solver,
        )
    }

    /// Single global solve. Requires zero degrees of freedom; any status
    /// other than optimal is returned as [`FlowsheetError::SolveFailed`].
    pub fn solve(&mut self, solver: &dyn Solver) -> FlowsheetResult<SolveOutcome> {
        let dof = solver.degrees_of_freedom(&self.model, Scope::All);
        if dof != 0 {
            return Err(FlowsheetError::GlobalDof { dof });
        }
        let outcome = solver.solve(&mut self.model, Scope::All)?;
        if !outcome.is_optimal() {
            warn!(
                solver = solver.name(),
                status = %outcome.status,
                iterations = outcome.iterations,
                "global solve failed"
            );
            return Err(FlowsheetError::SolveFailed {
                status: outcome.status,
                iterations: outcome.iterations,
                residual_norm: outcome.residual_norm,
            });
        }
        info!(
            solver = solver.name(),
            iterations = outcome.iterations,
            size = outcome.size,
            "global solve converged"
        );
        Ok(outcome)
    }

    /// Fix a precipitator's volume. Re-fixing a fixed parameter leaves the
    /// degrees of freedom unchanged.
    pub fn fix_precipitator_volume(&mut self, side: Side, volume_m3: f64) -> FlowsheetResult<()> {
        let volume = self
            .precipitator(side)
            .map(|p| p.volume())
            .ok_or_else(|| {
                FlowsheetError::config(format!("no {side} precipitator (precipitation disabled)"))
            })?;
        let value = ensure_non_negative(volume_m3, "precipitator volume")
            .map_err(|e| FlowsheetError::config(e.to_string()))?;
        self.model.fix(volume, value)?;
        debug!(%side, volume_m3 = value, "precipitator volume fixed");
        Ok(())
    }

    /// Precipitated mass of `solute` on `side` as a percentage of the feed.
    pub fn recovery(&self, side: Side, solute: &str) -> FlowsheetResult<f64> {
        let prec = self.precipitator(side).ok_or_else(|| {
            FlowsheetError::config(format!("no {side} precipitator (precipitation disabled)"))
        })?;
        let solid = prec
            .precipitate(solute)
            .ok_or_else(|| FlowsheetError::config(format!("'{solute}' is not tracked")))?;
        let fed = self.feed.outlet().mass_flow_value(&self.model, solute)?;
        if fed <= 0.0 {
            return Err(FlowsheetError::config(format!("feed carries no '{solute}'")));
        }
        Ok(self.model.value(solid)? / fed * 100.0)
    }

    /// Lithium recovered as permeate-side solids, percent of feed.
    pub fn prec_perc_li(&self) -> FlowsheetResult<f64> {
        self.recovery(Side::Permeate, "Li")
    }

    /// Cobalt recovered as retentate-side solids, percent of feed.
    pub fn prec_perc_co(&self) -> FlowsheetResult<f64> {
        self.recovery(Side::Retentate, "Co")
    }

    /// Current values of every stream, read at the producing outlet.
    pub fn stream_report(&self) -> FlowsheetResult<StreamReport> {
        let graph = &self.topology.graph;
        let units = self.package.units();
        let solutes = self.package.components();
        let mut rows = Vec::with_capacity(graph.streams().len());
        for stream in graph.streams() {
            let state = port_state(graph, &self.units, stream.from)?;
            let mass = solutes
                .iter()
                .map(|j| state.mass_flow_value(&self.model, j))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(StreamRow {
                name: stream.name.clone(),
                recycle: stream.kind == StreamKind::Recycle,
                flow: self.model.value(state.flow_vol())?,
                mass,
            });
        }
        Ok(StreamReport {
            solutes: solutes.names().to_vec(),
            flow_unit: units.flow_label(),
            mass_unit: units.mass_flow_label(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_graph::MixingStrategy;

    #[test]
    fn built_flowsheet_is_square() {
        let fs = Flowsheet::build(CascadeConfig::default()).unwrap();
        assert_eq!(fs.degrees_of_freedom(), 0);
        assert!(fs.unit("stage[2]").is_some());
        assert_eq!(
            fs.model().block_path(fs.unit("stage[1]").unwrap().block()),
            "fs.stage[1]"
        );
    }

    #[test]
    fn arcs_tie_every_stream() {
        let fs = Flowsheet::build(CascadeConfig::default()).unwrap();
        let root = fs.model().root();
        for stream in fs.topology().graph.streams() {
            assert!(
                fs.model()
                    .find_constraint(root, "eq_arc_flow", &stream.name)
                    .is_some(),
                "{}",
                stream.name
            );
        }
    }

    #[test]
    fn volume_fix_requires_precipitation() {
        let config = CascadeConfig {
            precipitate: false,
            mixing: MixingStrategy::FeedOnly,
            stages: 1,
            ..CascadeConfig::default()
        };
        let mut fs = Flowsheet::build(config).unwrap();
        assert!(fs.precipitator(Side::Permeate).is_none());
        let err = fs.fix_precipitator_volume(Side::Permeate, 500.0).unwrap_err();
        assert!(err.is_configuration());
        assert!(fs.recovery(Side::Retentate, "Co").is_err());
    }
}
