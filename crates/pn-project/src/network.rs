//! Turn a validated topology file into a live network.

use std::collections::HashMap;
use std::sync::Arc;

use pn_core::{NodeId, PnError};
use pn_graph::{InitialState, NodeKind, Topology, TopologyBuilder};
use pn_sim::Network;

use crate::schema::{InitialDef, NodeKindDef, TopologyDef};
use crate::validate::validate_topology_def;
use crate::{ProjectError, ProjectResult};

/// Build an immutable topology from a file definition.
///
/// Nodes are declared first and wired second, so upstream references may
/// point forward in the file.
pub fn build_topology(def: &TopologyDef) -> ProjectResult<Topology> {
    validate_topology_def(def)?;

    let mut builder = TopologyBuilder::new();
    let mut ids: HashMap<&str, NodeId> = HashMap::with_capacity(def.nodes.len());

    // Pass 1: every node except ties, whose sides may not exist yet.
    let mut ties = Vec::new();
    for node in &def.nodes {
        let kind = match &node.kind {
            NodeKindDef::Source { nominal_level } => NodeKind::Source {
                nominal_level: *nominal_level,
            },
            NodeKindDef::Breaker { capacity } => NodeKind::Breaker {
                capacity: *capacity,
            },
            NodeKindDef::Bus => NodeKind::Bus,
            NodeKindDef::Converter => NodeKind::Converter,
            NodeKindDef::Load { demand } => NodeKind::Load { demand: *demand },
            NodeKindDef::Tie { sides } => {
                ties.push((node, sides));
                continue;
            }
        };
        let id = builder.add_node(node.name.clone(), kind);
        builder.set_initial(id, initial_state(node.initial));
        ids.insert(node.name.as_str(), id);
    }
    for (node, [a, b]) in ties {
        let id = builder.add_tie(node.name.clone(), lookup(&ids, a)?, lookup(&ids, b)?);
        builder.set_initial(id, initial_state(node.initial));
        ids.insert(node.name.as_str(), id);
    }

    // Pass 2: wiring, in declared priority order.
    for node in &def.nodes {
        let id = lookup(&ids, &node.name)?;
        for upstream in &node.upstream {
            builder.connect(lookup(&ids, upstream)?, id);
        }
    }

    for selector in &def.selectors {
        let positions = selector
            .positions
            .iter()
            .map(|p| {
                let members = p
                    .members
                    .iter()
                    .map(|m| lookup(&ids, m))
                    .collect::<ProjectResult<Vec<_>>>()?;
                Ok((p.name.clone(), members))
            })
            .collect::<ProjectResult<Vec<_>>>()?;
        builder.add_selector(selector.name.clone(), positions);
    }

    Ok(builder.build()?)
}

/// Build a network in its declared initial state with the file's scripted
/// faults queued.
pub fn build_network(def: &TopologyDef) -> ProjectResult<Network> {
    let topology = Arc::new(build_topology(def)?);
    let mut network = Network::new(topology);
    for fault in &def.faults {
        let node = network.resolve(&fault.node)?;
        network.schedule_fault(fault.tick, node, fault.action)?;
    }
    Ok(network)
}

fn initial_state(def: Option<InitialDef>) -> InitialState {
    let defaults = InitialState::default();
    let Some(def) = def else {
        return defaults;
    };
    InitialState {
        commanded_open: def.commanded_open.unwrap_or(defaults.commanded_open),
        engaged: def.engaged.unwrap_or(defaults.engaged),
        active: def.active.unwrap_or(defaults.active),
    }
}

fn lookup(ids: &HashMap<&str, NodeId>, name: &str) -> ProjectResult<NodeId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| ProjectError::Core(PnError::lookup(name)))
}
