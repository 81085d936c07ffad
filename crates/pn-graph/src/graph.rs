//! Core topology data structures.

use std::collections::HashMap;

use pn_core::{NodeId, PnError, PnResult, Real, SelectorId};

/// Kind of a resource node, with the static parameters that kind carries.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Battery, fuel cell or tank. Produces `nominal_level` when connected.
    Source { nominal_level: Real },
    /// Circuit breaker or toggle switch. Pops when downstream demand exceeds `capacity`.
    Breaker { capacity: Option<Real> },
    /// Aggregation point.
    Bus,
    /// Cross-tie joining two buses into one island when engaged.
    Tie { sides: [NodeId; 2] },
    /// Inverter-style pass-through from one bus to the next.
    Converter,
    /// Pure consumer.
    Load { demand: Real },
}

impl NodeKind {
    /// Short lowercase label used in errors and reports.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Source { .. } => "source",
            NodeKind::Breaker { .. } => "breaker",
            NodeKind::Bus => "bus",
            NodeKind::Tie { .. } => "tie",
            NodeKind::Converter => "converter",
            NodeKind::Load { .. } => "load",
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, NodeKind::Source { .. })
    }

    pub fn is_breaker(&self) -> bool {
        matches!(self, NodeKind::Breaker { .. })
    }

    pub fn is_bus(&self) -> bool {
        matches!(self, NodeKind::Bus)
    }

    pub fn is_tie(&self) -> bool {
        matches!(self, NodeKind::Tie { .. })
    }

    pub fn is_converter(&self) -> bool {
        matches!(self, NodeKind::Converter)
    }

    pub fn is_load(&self) -> bool {
        matches!(self, NodeKind::Load { .. })
    }
}

/// Commanded state a node starts with when no saved state is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialState {
    /// Breaker/switch thrown open (sources: disconnected).
    pub commanded_open: bool,
    /// Tie engaged.
    pub engaged: bool,
    /// Converter running.
    pub active: bool,
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            commanded_open: false,
            engaged: false,
            active: true,
        }
    }
}

/// A node in the resource network.
///
/// Nodes never change kind or rewire after the topology is built; only
/// their state (held elsewhere) changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Upstream references in declaration order. The first available one
    /// supplies the reported level.
    pub upstream: Vec<NodeId>,
    pub initial: InitialState,
}

impl ResourceNode {
    /// Trip rating, for breakers that have one.
    pub fn capacity(&self) -> Option<Real> {
        match self.kind {
            NodeKind::Breaker { capacity } => capacity,
            _ => None,
        }
    }

    /// Draw a powered load places on its feed path.
    pub fn demand(&self) -> Real {
        match self.kind {
            NodeKind::Load { demand } => demand,
            _ => 0.0,
        }
    }
}

/// One position of a selector switch: the converters it activates and the
/// breakers it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPosition {
    pub name: String,
    pub members: Vec<NodeId>,
}

/// A multi-position panel switch driving several converters or breakers at once
/// (e.g. the EPS inverter select switch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub id: SelectorId,
    pub name: String,
    pub positions: Vec<SelectorPosition>,
}

impl Selector {
    /// Every node any position touches, deduplicated, in first-seen order.
    pub fn members(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = Vec::new();
        for position in &self.positions {
            for &member in &position.members {
                if !out.contains(&member) {
                    out.push(member);
                }
            }
        }
        out
    }

    pub fn position_index(&self, name: &str) -> Option<usize> {
        self.positions.iter().position(|p| p.name == name)
    }
}

/// The topology: a validated, immutable wiring table.
///
/// The topology stores:
/// - All nodes in a vector indexed by their IDs.
/// - Compact downstream adjacency: for each node, which nodes list it as upstream.
/// - The evaluation order, fixed at construction.
///
/// It is read-only after construction and can be shared across threads.
#[derive(Debug, Clone)]
pub struct Topology {
    pub(crate) nodes: Vec<ResourceNode>,
    pub(crate) selectors: Vec<Selector>,
    pub(crate) names: HashMap<String, NodeId>,

    /// Offsets for node->downstream adjacency: node i's dependents are in
    /// downstream[downstream_offsets[i]..downstream_offsets[i+1]].
    pub(crate) downstream_offsets: Vec<usize>,
    pub(crate) downstream: Vec<NodeId>,

    /// Every non-tie node, sources first, dependents after all their upstreams.
    pub(crate) order: Vec<NodeId>,
    pub(crate) ties: Vec<NodeId>,
    pub(crate) loads: Vec<NodeId>,
}

impl Topology {
    /// Return all nodes.
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by ID (returns None if ID out of bounds).
    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.nodes.get(id.slot())
    }

    /// Get a node by ID or fail with a lookup error.
    pub fn try_node(&self, id: NodeId) -> PnResult<&ResourceNode> {
        self.node(id).ok_or(PnError::UnknownId { id })
    }

    /// Resolve a node name.
    pub fn id_of(&self, name: &str) -> PnResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| PnError::lookup(name))
    }

    /// Name of a node, or `"?"` for an id from another topology.
    pub fn name_of(&self, id: NodeId) -> &str {
        self.node(id).map_or("?", |n| n.name.as_str())
    }

    /// Nodes that list `id` as an upstream reference.
    pub fn downstream_of(&self, id: NodeId) -> &[NodeId] {
        let idx = id.slot();
        if idx >= self.nodes.len() {
            return &[];
        }
        let start = self.downstream_offsets[idx];
        let end = self.downstream_offsets[idx + 1];
        &self.downstream[start..end]
    }

    /// Evaluation order fixed at construction: every non-tie node appears after
    /// all of its upstream references.
    pub fn eval_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn ties(&self) -> &[NodeId] {
        &self.ties
    }

    pub fn loads(&self) -> &[NodeId] {
        &self.loads
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn selector(&self, id: SelectorId) -> Option<&Selector> {
        self.selectors.get(id.slot())
    }

    pub fn selector_id(&self, name: &str) -> PnResult<SelectorId> {
        self.selectors
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| PnError::lookup(name))
    }

    /// Every node reachable downstream of `id` (not including `id`), in
    /// evaluation order.
    pub fn reachable_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for &next in self.downstream_of(current) {
                if !seen[next.slot()] {
                    seen[next.slot()] = true;
                    stack.push(next);
                }
            }
        }
        self.order.iter().copied().filter(|n| seen[n.slot()]).collect()
    }
}
