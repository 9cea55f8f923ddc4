//! Incremental graph builder.

use sf_core::{PortId, StreamId, UnitId};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, Port, PortKind, Stream, StreamKind, Unit, UnitKind};
use crate::validate;

/// Builder for constructing a stage graph incrementally.
///
/// Use `add_unit` and `connect` to build up the graph,
/// then call `build()` to validate and freeze it into an immutable `Graph`.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    units: Vec<Unit>,
    ports: Vec<Port>,
    streams: Vec<Stream>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit with named inlet and outlet ports and return its ID.
    pub fn add_unit(
        &mut self,
        name: impl Into<String>,
        kind: UnitKind,
        inlets: &[&str],
        outlets: &[&str],
    ) -> UnitId {
        let id = UnitId::from_slot(self.units.len());
        let inlets = inlets
            .iter()
            .map(|p| self.add_port(id, p, PortKind::Inlet))
            .collect();
        let outlets = outlets
            .iter()
            .map(|p| self.add_port(id, p, PortKind::Outlet))
            .collect();
        self.units.push(Unit {
            id,
            name: name.into(),
            kind,
            inlets,
            outlets,
        });
        id
    }

    fn add_port(&mut self, unit: UnitId, name: &str, kind: PortKind) -> PortId {
        let id = PortId::from_slot(self.ports.len());
        self.ports.push(Port {
            id,
            unit,
            name: name.to_string(),
            kind,
        });
        id
    }

    /// Look up a port of `unit` by name.
    pub fn port(&self, unit: UnitId, name: &str) -> GraphResult<PortId> {
        let owner = self.units.get(unit.slot());
        owner
            .and_then(|u| {
                u.inlets
                    .iter()
                    .chain(&u.outlets)
                    .copied()
                    .find(|p| self.ports[p.slot()].name == name)
            })
            .ok_or_else(|| GraphError::UnknownPort {
                unit: owner.map_or_else(|| unit.to_string(), |u| u.name.clone()),
                port: name.to_string(),
            })
    }

    /// Connect `from_unit.from_port` to `to_unit.to_port` with a named stream.
    pub fn connect(
        &mut self,
        name: impl Into<String>,
        (from_unit, from_port): (UnitId, &str),
        (to_unit, to_port): (UnitId, &str),
        kind: StreamKind,
    ) -> GraphResult<StreamId> {
        let from = self.port(from_unit, from_port)?;
        let to = self.port(to_unit, to_port)?;
        let id = StreamId::from_slot(self.streams.len());
        self.streams.push(Stream {
            id,
            name: name.into(),
            from,
            to,
            kind,
        });
        Ok(id)
    }

    /// Build and validate the graph, returning an immutable `Graph`.
    ///
    /// Fails if any port is unconnected or carries more than one stream.
    pub fn build(self) -> GraphResult<Graph> {
        validate::validate_names(&self.units)?;
        validate::validate_directions(&self.ports, &self.streams)?;
        let port_streams = validate::attach_streams(&self.units, &self.ports, &self.streams)?;

        Ok(Graph {
            units: self.units,
            ports: self.ports,
            streams: self.streams,
            port_streams,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_basic() {
        let mut builder = GraphBuilder::new();
        let feed = builder.add_unit("feed", UnitKind::Source, &[], &["outlet"]);
        let product = builder.add_unit("product", UnitKind::Product, &["inlet"], &[]);
        assert_eq!(feed.index(), 0);
        assert_eq!(product.index(), 1);
        assert_eq!(builder.ports.len(), 2);
        assert!(builder.port(feed, "outlet").is_ok());
        assert!(matches!(
            builder.port(feed, "inlet"),
            Err(GraphError::UnknownPort { .. })
        ));
    }

    #[test]
    fn builder_build_simple() {
        let mut builder = GraphBuilder::new();
        let feed = builder.add_unit("feed", UnitKind::Source, &[], &["outlet"]);
        let product = builder.add_unit("product", UnitKind::Product, &["inlet"], &[]);
        let s = builder
            .connect(
                "feed",
                (feed, "outlet"),
                (product, "inlet"),
                StreamKind::FeedForward,
            )
            .unwrap();

        let graph = builder.build().unwrap();
        assert_eq!(graph.units().len(), 2);
        assert_eq!(graph.producer(s), Some(feed));
        assert_eq!(graph.consumer(s), Some(product));
        assert_eq!(graph.inbound(product), vec![s]);
        assert_eq!(graph.outbound(feed), vec![s]);
    }

    #[test]
    fn dangling_inlet_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add_unit("mixer", UnitKind::Mixer, &["inlet_1"], &["outlet"]);
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            GraphError::DanglingPort {
                kind: PortKind::Inlet,
                ..
            }
        ));
    }
}
