//! Core graph data structures.

use sf_core::{PortId, StreamId, UnitId};

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Inlet,
    Outlet,
}

/// Role of a unit in the flowsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Boundary stream with fixed flow and composition.
    Source,
    Mixer,
    Splitter,
    /// Membrane stage with permeate and retentate outlets.
    Stage,
    Precipitator,
    /// Boundary sink.
    Product,
}

/// Whether a stream flows with the cascade or back against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    FeedForward,
    Recycle,
}

/// A named connection point on a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id: PortId,
    pub unit: UnitId,
    pub name: String,
    pub kind: PortKind,
}

/// A node of the stage graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    pub inlets: Vec<PortId>,
    pub outlets: Vec<PortId>,
}

/// Directed edge from an outlet port to an inlet port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub id: StreamId,
    pub name: String,
    pub from: PortId,
    pub to: PortId,
    pub kind: StreamKind,
}

/// The graph: a validated, immutable collection of units, ports and streams.
///
/// Units are kept in declaration order, which the initializer uses to break
/// ties. Every port carries exactly one stream.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) units: Vec<Unit>,
    pub(crate) ports: Vec<Port>,
    pub(crate) streams: Vec<Stream>,

    /// Stream attached to each port, indexed by port slot.
    pub(crate) port_streams: Vec<StreamId>,
}

impl Graph {
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.slot())
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.slot())
    }

    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(id.slot())
    }

    pub fn unit_by_name(&self, name: &str) -> Option<UnitId> {
        self.units.iter().find(|u| u.name == name).map(|u| u.id)
    }

    pub fn stream_by_name(&self, name: &str) -> Option<StreamId> {
        self.streams.iter().find(|s| s.name == name).map(|s| s.id)
    }

    /// Stream attached to a port.
    pub fn port_stream(&self, port: PortId) -> Option<StreamId> {
        self.port_streams.get(port.slot()).copied()
    }

    /// Streams entering a unit, in inlet port order.
    pub fn inbound(&self, unit: UnitId) -> Vec<StreamId> {
        self.unit(unit)
            .map(|u| {
                u.inlets
                    .iter()
                    .filter_map(|&p| self.port_stream(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Streams leaving a unit, in outlet port order.
    pub fn outbound(&self, unit: UnitId) -> Vec<StreamId> {
        self.unit(unit)
            .map(|u| {
                u.outlets
                    .iter()
                    .filter_map(|&p| self.port_stream(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Unit owning the outlet a stream leaves from.
    pub fn producer(&self, stream: StreamId) -> Option<UnitId> {
        let s = self.stream(stream)?;
        Some(self.port(s.from)?.unit)
    }

    /// Unit owning the inlet a stream enters.
    pub fn consumer(&self, stream: StreamId) -> Option<UnitId> {
        let s = self.stream(stream)?;
        Some(self.port(s.to)?.unit)
    }

    pub fn recycle_streams(&self) -> impl Iterator<Item = &Stream> {
        self.streams
            .iter()
            .filter(|s| s.kind == StreamKind::Recycle)
    }

    /// `unit.port` label for a port id.
    pub fn port_label(&self, port: PortId) -> String {
        match self.port(port) {
            Some(p) => {
                let unit = self.unit(p.unit).map_or("?", |u| u.name.as_str());
                format!("{}.{}", unit, p.name)
            }
            None => format!("<unknown port {port}>"),
        }
    }
}
