//! Common utilities for unit models.

use std::collections::BTreeMap;

use sf_core::{BlockId, VarId, ensure_non_negative};
use sf_model::Model;
use sf_props::{PropertyPackage, StateBlock, StateProvider};

use crate::error::{UnitError, UnitResult};
use crate::traits::NamedState;

/// State block name for a port: `properties_in`, `properties_out` or
/// `properties_<port>`.
pub fn state_block_name(port: &str) -> String {
    match port {
        "inlet" => "properties_in".to_string(),
        "outlet" => "properties_out".to_string(),
        other => format!("properties_{other}"),
    }
}

/// Build one state block per port under `block`.
pub fn build_ports(
    model: &mut Model,
    block: BlockId,
    package: &dyn PropertyPackage,
    ports: &[&str],
) -> UnitResult<Vec<NamedState>> {
    ports
        .iter()
        .map(|&port| {
            let state = package.build_state(model, block, &state_block_name(port))?;
            Ok(NamedState {
                port: port.to_string(),
                state,
            })
        })
        .collect()
}

/// Per-component mass flow variables of a state, in component order.
pub fn mass_flows(model: &Model, state: &StateBlock) -> UnitResult<Vec<VarId>> {
    state
        .components()
        .iter()
        .map(|j| {
            state
                .flow_mass_comp(j)
                .ok_or_else(|| UnitError::UnsupportedBasis {
                    block: model.block_path(state.block()).to_string(),
                    what: "per-component mass flows required",
                })
        })
        .collect()
}

/// Finite, non-negative parameter value.
pub fn check_param(block: &str, value: f64, what: &'static str) -> UnitResult<f64> {
    ensure_non_negative(value, what).map_err(|source| UnitError::InvalidParameter {
        block: block.to_string(),
        source,
    })
}

/// Look up a per-component coefficient, failing with the component named.
pub fn per_component(
    block: &str,
    table: &BTreeMap<String, f64>,
    component: &str,
    what: &str,
) -> UnitResult<f64> {
    table
        .get(component)
        .copied()
        .ok_or_else(|| UnitError::MissingParameter {
            block: block.to_string(),
            what: format!("{what} for '{component}'"),
        })
}

/// Current values of `vars`.
pub fn values_of(model: &Model, vars: &[VarId]) -> UnitResult<Vec<f64>> {
    Ok(vars
        .iter()
        .map(|&v| model.value(v))
        .collect::<Result<Vec<_>, _>>()?)
}
