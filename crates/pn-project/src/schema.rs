//! Topology file schema definitions.
//!
//! Nodes refer to each other by name. A file is turned into a live
//! [`pn_graph::Topology`] by [`crate::build_topology`].

use pn_sim::FaultAction;
use serde::{Deserialize, Serialize};

/// Current topology file format.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopologyDef {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub selectors: Vec<SelectorDef>,
    /// Scripted failures queued when the network is built.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<FaultDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDef {
    pub name: String,
    pub kind: NodeKindDef,
    /// Feeds in priority order; the first available one wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstream: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<InitialDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum NodeKindDef {
    Source {
        nominal_level: f64,
    },
    Breaker {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        capacity: Option<f64>,
    },
    Bus,
    Tie {
        sides: [String; 2],
    },
    Converter,
    Load {
        #[serde(default)]
        demand: f64,
    },
}

impl NodeKindDef {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKindDef::Source { .. } => "source",
            NodeKindDef::Breaker { .. } => "breaker",
            NodeKindDef::Bus => "bus",
            NodeKindDef::Tie { .. } => "tie",
            NodeKindDef::Converter => "converter",
            NodeKindDef::Load { .. } => "load",
        }
    }
}

/// Declared power-up state. Omitted fields keep their defaults
/// (closed, disengaged, active).
///
/// ```yaml
/// initial:
///   commanded_open: true
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct InitialDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commanded_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engaged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorDef {
    pub name: String,
    pub positions: Vec<PositionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionDef {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaultDef {
    pub tick: u64,
    pub node: String,
    pub action: FaultAction,
}
