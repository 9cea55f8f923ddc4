//! Cascade configuration.
//!
//! Everything a diafiltration run needs is created once here and passed by
//! reference to the builder and sequencer. Defaults reproduce the two-solute
//! lithium/cobalt case.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sf_core::{ensure_fraction, ensure_non_negative, kgph, m, m3ph};
use sf_graph::{MixingStrategy, Side, TopologySpec};
use sf_props::{SoluteSet, StateArgs};
use sf_solver::NewtonConfig;
use sf_units::{MembraneParams, PrecipitatorParams};

use crate::error::{FlowsheetError, FlowsheetResult};

/// Boundary stream: solvent in m³/h and solute mass flows in kg/h.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSpec {
    pub solvent_m3ph: f64,
    #[serde(default)]
    pub solutes_kgph: BTreeMap<String, f64>,
}

impl StreamSpec {
    pub fn new<'a>(solvent_m3ph: f64, solutes: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            solvent_m3ph,
            solutes_kgph: solutes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// State arguments for a stream block. Solutes not listed are zero.
    pub fn state_args(&self, solutes: &SoluteSet) -> StateArgs {
        let mut args = StateArgs::new().flow_vol(m3ph(self.solvent_m3ph));
        for j in solutes.iter() {
            let mass = self.solutes_kgph.get(j).copied().unwrap_or(0.0);
            args = args.mass_flow(j, kgph(mass));
        }
        args
    }

    fn validate(&self, what: &str, solutes: &SoluteSet) -> FlowsheetResult<()> {
        check(what, "solvent flow", self.solvent_m3ph)?;
        for (name, &mass) in &self.solutes_kgph {
            if !solutes.contains(name) {
                return Err(FlowsheetError::config(format!(
                    "{what}: '{name}' is not in the solute set {solutes}"
                )));
            }
            check(what, "solute mass flow", mass)?;
        }
        Ok(())
    }
}

/// Precipitation yields for the two product sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideYields {
    pub permeate: BTreeMap<String, f64>,
    pub retentate: BTreeMap<String, f64>,
}

impl SideYields {
    pub fn params(&self, side: Side) -> PrecipitatorParams {
        let yields = match side {
            Side::Permeate => &self.permeate,
            Side::Retentate => &self.retentate,
        };
        PrecipitatorParams {
            yields: yields.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadeConfig {
    pub stages: usize,
    /// Tube elements per stage.
    pub tubes: usize,
    pub mixing: MixingStrategy,
    pub solutes: Vec<String>,
    /// Solvent flux per metre of membrane, m³/h/m.
    pub flux: f64,
    pub membrane_length_m: f64,
    pub sieving: BTreeMap<String, f64>,
    pub feed: StreamSpec,
    pub diafiltrate: StreamSpec,
    pub precipitate: bool,
    pub yields: SideYields,
    pub precipitator_volume_m3: f64,
    /// Initial guess for streams whose producer is not yet initialized.
    /// Falls back to the diafiltrate stream.
    pub recycle_guess: Option<StreamSpec>,
    pub solver: NewtonConfig,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            stages: 2,
            tubes: 10,
            mixing: MixingStrategy::Recycle,
            solutes: vec!["Li".to_string(), "Co".to_string()],
            flux: 0.1,
            membrane_length_m: 100.0,
            sieving: BTreeMap::from([("Li".to_string(), 1.3), ("Co".to_string(), 0.5)]),
            feed: StreamSpec::new(100.0, [("Li", 1.7 * 100.0), ("Co", 17.0 * 100.0)]),
            diafiltrate: StreamSpec::new(30.0, [("Li", 0.1 * 30.0), ("Co", 0.2 * 30.0)]),
            precipitate: true,
            yields: SideYields {
                permeate: BTreeMap::from([("Li".to_string(), 0.81), ("Co".to_string(), 0.01)]),
                retentate: BTreeMap::from([("Li".to_string(), 0.20), ("Co".to_string(), 0.89)]),
            },
            precipitator_volume_m3: 500.0,
            recycle_guess: None,
            solver: NewtonConfig::default(),
        }
    }
}

fn check(context: &str, what: &'static str, value: f64) -> FlowsheetResult<f64> {
    ensure_non_negative(value, what)
        .map_err(|e| FlowsheetError::config(format!("{context}: {e}")))
}

impl CascadeConfig {
    /// Parse from YAML; fields left out take their defaults.
    pub fn from_yaml_str(content: &str) -> FlowsheetResult<Self> {
        let config: CascadeConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_yaml(path: &Path) -> FlowsheetResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| FlowsheetError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml_str(&content)
    }

    pub fn solute_set(&self) -> FlowsheetResult<SoluteSet> {
        Ok(SoluteSet::new(&self.solutes)?)
    }

    pub fn topology_spec(&self) -> TopologySpec {
        TopologySpec {
            stages: self.stages,
            tubes: self.tubes,
            strategy: self.mixing,
            precipitate: self.precipitate,
        }
    }

    pub fn membrane(&self) -> MembraneParams {
        MembraneParams {
            flux: self.flux,
            sieving: self.sieving.clone(),
        }
    }

    pub fn membrane_length(&self) -> sf_core::Length {
        m(self.membrane_length_m)
    }

    pub fn guess(&self) -> &StreamSpec {
        self.recycle_guess.as_ref().unwrap_or(&self.diafiltrate)
    }

    /// Check parameter values. Stage and tube counts are checked by the
    /// topology builder.
    pub fn validate(&self) -> FlowsheetResult<()> {
        let solutes = self.solute_set()?;
        check("membrane", "flux", self.flux)?;
        check("membrane", "length", self.membrane_length_m)?;
        for j in solutes.iter() {
            let s = self.sieving.get(j).copied().ok_or_else(|| {
                FlowsheetError::config(format!("no sieving coefficient for '{j}'"))
            })?;
            check("membrane", "sieving coefficient", s)?;
        }

        self.feed.validate("feed", &solutes)?;
        self.diafiltrate.validate("diafiltrate", &solutes)?;
        if let Some(guess) = &self.recycle_guess {
            guess.validate("recycle guess", &solutes)?;
        }

        if self.precipitate {
            check("precipitator", "volume", self.precipitator_volume_m3)?;
            for side in Side::BOTH {
                let params = self.yields.params(side);
                for j in solutes.iter() {
                    let y = params.yields.get(j).copied().ok_or_else(|| {
                        FlowsheetError::config(format!("no {side} precipitation yield for '{j}'"))
                    })?;
                    ensure_fraction(y, "precipitation yield").map_err(|e| {
                        FlowsheetError::config(format!("{side} side, '{j}': {e}"))
                    })?;
                }
            }
        }
        Ok(())
    }
}
