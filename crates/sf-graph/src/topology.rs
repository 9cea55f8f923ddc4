//! Diafiltration cascade topologies.
//!
//! A cascade is described by its stage count, the number of tube elements
//! per stage and a mixing strategy. `build_topology` turns that into a
//! validated [`Graph`] with units declared in upstream-to-downstream order:
//! sources, then `mixer[k]`/`stage[k]` pairs, then collectors,
//! precipitators and products.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sf_core::{StreamId, UnitId};
use tracing::debug;

use crate::builder::GraphBuilder;
use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, StreamKind, UnitKind};

/// How streams are combined in front of each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MixingStrategy {
    /// Each stage takes the upstream retentate plus its own share of fresh
    /// diafiltrate. No recycle.
    FeedOnly,
    /// Counter-current: each stage takes the upstream retentate plus the
    /// permeate of the next stage; fresh diafiltrate enters the last stage.
    Recycle,
}

impl MixingStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            MixingStrategy::FeedOnly => "feed-only",
            MixingStrategy::Recycle => "recycle",
        }
    }
}

impl fmt::Display for MixingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MixingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed-only" | "feed_only" => Ok(MixingStrategy::FeedOnly),
            "recycle" => Ok(MixingStrategy::Recycle),
            other => Err(format!(
                "unknown mixing strategy '{other}' (expected 'feed-only' or 'recycle')"
            )),
        }
    }
}

/// Which product side a precipitator or recovery figure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Permeate,
    Retentate,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Permeate, Side::Retentate];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Permeate => "permeate",
            Side::Retentate => "retentate",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologySpec {
    pub stages: usize,
    pub tubes: usize,
    pub strategy: MixingStrategy,
    /// Route both products through a precipitator.
    pub precipitate: bool,
}

impl TopologySpec {
    pub fn validate(&self) -> GraphResult<()> {
        if self.stages == 0 {
            return Err(GraphError::InvalidCount {
                what: "stage count",
                value: self.stages,
            });
        }
        if self.tubes == 0 {
            return Err(GraphError::InvalidCount {
                what: "tube count",
                value: self.tubes,
            });
        }
        if self.strategy == MixingStrategy::Recycle && self.stages < 2 {
            return Err(GraphError::IncompatibleCounts {
                strategy: self.strategy.to_string(),
                stages: self.stages,
                tubes: self.tubes,
                reason: "recycle needs at least 2 stages",
            });
        }
        Ok(())
    }
}

/// Units created for one cascade stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageUnits {
    pub mixer: UnitId,
    pub stage: UnitId,
}

/// Built cascade graph plus handles to its notable units and streams.
#[derive(Debug, Clone)]
pub struct Topology {
    pub spec: TopologySpec,
    pub graph: Graph,
    pub feed: UnitId,
    pub diafiltrate: UnitId,
    /// Index `k - 1` holds stage `k`.
    pub stages: Vec<StageUnits>,
    pub splitter: Option<UnitId>,
    pub collector: Option<UnitId>,
    /// Present when precipitation is enabled, in [`Side::BOTH`] order.
    pub precipitators: Vec<(Side, UnitId)>,
    pub products: [(Side, UnitId); 2],
}

impl Topology {
    pub fn precipitator(&self, side: Side) -> Option<UnitId> {
        self.precipitators
            .iter()
            .find(|(s, _)| *s == side)
            .map(|(_, u)| *u)
    }

    pub fn product(&self, side: Side) -> UnitId {
        match side {
            Side::Permeate => self.products[0].1,
            Side::Retentate => self.products[1].1,
        }
    }

    pub fn recycle_streams(&self) -> Vec<StreamId> {
        self.graph.recycle_streams().map(|s| s.id).collect()
    }
}

pub fn stage_name(k: usize) -> String {
    format!("stage[{k}]")
}

pub fn mixer_name(k: usize) -> String {
    format!("mixer[{k}]")
}

fn numbered_ports(prefix: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{prefix}_{i}")).collect()
}

/// Build the stage graph for `spec`.
///
/// Rejects zero counts and strategy/count combinations the strategy cannot
/// realize before allocating anything.
pub fn build_topology(spec: &TopologySpec) -> GraphResult<Topology> {
    spec.validate()?;
    let ns = spec.stages;
    let ff = StreamKind::FeedForward;
    let mut b = GraphBuilder::new();

    let feed = b.add_unit("feed", UnitKind::Source, &[], &["outlet"]);
    let diafiltrate = b.add_unit("diafiltrate", UnitKind::Source, &[], &["outlet"]);

    let splitter = if spec.strategy == MixingStrategy::FeedOnly && ns > 1 {
        let outlets = numbered_ports("outlet", ns);
        let outlets: Vec<&str> = outlets.iter().map(String::as_str).collect();
        Some(b.add_unit(
            "diafiltrate_splitter",
            UnitKind::Splitter,
            &["inlet"],
            &outlets,
        ))
    } else {
        None
    };

    let stages: Vec<StageUnits> = (1..=ns)
        .map(|k| StageUnits {
            mixer: b.add_unit(
                mixer_name(k),
                UnitKind::Mixer,
                &["inlet_1", "inlet_2"],
                &["outlet"],
            ),
            stage: b.add_unit(
                stage_name(k),
                UnitKind::Stage,
                &["inlet"],
                &["permeate", "retentate"],
            ),
        })
        .collect();

    let collector = if spec.strategy == MixingStrategy::FeedOnly && ns > 1 {
        let inlets = numbered_ports("inlet", ns);
        let inlets: Vec<&str> = inlets.iter().map(String::as_str).collect();
        Some(b.add_unit(
            "permeate_collector",
            UnitKind::Mixer,
            &inlets,
            &["outlet"],
        ))
    } else {
        None
    };

    let precipitators: Vec<(Side, UnitId)> = if spec.precipitate {
        Side::BOTH
            .iter()
            .map(|&side| {
                let unit = b.add_unit(
                    format!("precipitator[{side}]"),
                    UnitKind::Precipitator,
                    &["inlet"],
                    &["outlet"],
                );
                (side, unit)
            })
            .collect()
    } else {
        Vec::new()
    };

    let products = Side::BOTH.map(|side| {
        let unit = b.add_unit(
            format!("{side}_product"),
            UnitKind::Product,
            &["inlet"],
            &[],
        );
        (side, unit)
    });

    // Stage front ends.
    b.connect("feed", (feed, "outlet"), (stages[0].mixer, "inlet_1"), ff)?;
    for (i, su) in stages.iter().enumerate() {
        let k = i + 1;
        b.connect(
            format!("stage_feed[{k}]"),
            (su.mixer, "outlet"),
            (su.stage, "inlet"),
            ff,
        )?;
        if k < ns {
            b.connect(
                format!("retentate[{k}]"),
                (su.stage, "retentate"),
                (stages[k].mixer, "inlet_1"),
                ff,
            )?;
        }
    }

    // Diafiltrate and permeate routing.
    let permeate_out = match spec.strategy {
        MixingStrategy::FeedOnly => {
            match splitter {
                Some(sp) => {
                    b.connect(
                        "diafiltrate",
                        (diafiltrate, "outlet"),
                        (sp, "inlet"),
                        ff,
                    )?;
                    for (i, su) in stages.iter().enumerate() {
                        let k = i + 1;
                        b.connect(
                            format!("diafiltrate[{k}]"),
                            (sp, format!("outlet_{k}").as_str()),
                            (su.mixer, "inlet_2"),
                            ff,
                        )?;
                    }
                }
                None => {
                    b.connect(
                        "diafiltrate",
                        (diafiltrate, "outlet"),
                        (stages[0].mixer, "inlet_2"),
                        ff,
                    )?;
                }
            }
            match collector {
                Some(col) => {
                    for (i, su) in stages.iter().enumerate() {
                        let k = i + 1;
                        b.connect(
                            format!("permeate[{k}]"),
                            (su.stage, "permeate"),
                            (col, format!("inlet_{k}").as_str()),
                            ff,
                        )?;
                    }
                    (col, "outlet")
                }
                None => (stages[0].stage, "permeate"),
            }
        }
        MixingStrategy::Recycle => {
            b.connect(
                "diafiltrate",
                (diafiltrate, "outlet"),
                (stages[ns - 1].mixer, "inlet_2"),
                ff,
            )?;
            for k in 2..=ns {
                b.connect(
                    format!("permeate[{k}]"),
                    (stages[k - 1].stage, "permeate"),
                    (stages[k - 2].mixer, "inlet_2"),
                    StreamKind::Recycle,
                )?;
            }
            (stages[0].stage, "permeate")
        }
    };
    let retentate_out = (stages[ns - 1].stage, "retentate");

    // Products, optionally through precipitators.
    for (&(side, product), out) in products.iter().zip([permeate_out, retentate_out]) {
        match precipitators.iter().find(|(s, _)| *s == side) {
            Some(&(_, prec)) => {
                b.connect(side.as_str(), out, (prec, "inlet"), ff)?;
                b.connect(
                    format!("{side}_liquor"),
                    (prec, "outlet"),
                    (product, "inlet"),
                    ff,
                )?;
            }
            None => {
                b.connect(side.as_str(), out, (product, "inlet"), ff)?;
            }
        }
    }

    let graph = b.build()?;
    debug!(
        strategy = %spec.strategy,
        stages = ns,
        tubes = spec.tubes,
        units = graph.units().len(),
        streams = graph.streams().len(),
        "cascade topology built"
    );

    Ok(Topology {
        spec: *spec,
        graph,
        feed,
        diafiltrate,
        stages,
        splitter,
        collector,
        precipitators,
        products,
    })
}
