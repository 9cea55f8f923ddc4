//! Graph validation logic.

use std::collections::HashSet;

use sf_core::StreamId;

use crate::error::{GraphError, GraphResult};
use crate::graph::{Port, PortKind, Stream, Unit};

/// Unit names double as block names, so they must be unique.
pub(crate) fn validate_names(units: &[Unit]) -> GraphResult<()> {
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert(unit.name.as_str()) {
            return Err(GraphError::DuplicateUnit {
                name: unit.name.clone(),
            });
        }
    }
    Ok(())
}

/// Streams leave outlets and enter inlets.
pub(crate) fn validate_directions(ports: &[Port], streams: &[Stream]) -> GraphResult<()> {
    for stream in streams {
        for (port, expected) in [(stream.from, PortKind::Outlet), (stream.to, PortKind::Inlet)] {
            if ports[port.slot()].kind != expected {
                return Err(GraphError::PortDirection {
                    stream: stream.name.clone(),
                    port,
                });
            }
        }
    }
    Ok(())
}

/// Check that every port carries exactly one stream and return the
/// port -> stream map, indexed by port slot.
pub(crate) fn attach_streams(
    units: &[Unit],
    ports: &[Port],
    streams: &[Stream],
) -> GraphResult<Vec<StreamId>> {
    let mut attached: Vec<Vec<StreamId>> = vec![Vec::new(); ports.len()];
    for stream in streams {
        attached[stream.from.slot()].push(stream.id);
        attached[stream.to.slot()].push(stream.id);
    }

    let mut port_streams = Vec::with_capacity(ports.len());
    for (port, list) in ports.iter().zip(&attached) {
        let unit = units[port.unit.slot()].name.clone();
        match list.as_slice() {
            [only] => port_streams.push(*only),
            [] => {
                return Err(GraphError::DanglingPort {
                    unit,
                    port: port.name.clone(),
                    kind: port.kind,
                });
            }
            many => {
                return Err(GraphError::MultiplyConnected {
                    unit,
                    port: port.name.clone(),
                    count: many.len(),
                });
            }
        }
    }
    Ok(port_streams)
}
