//! Incremental topology builder.

use std::collections::HashMap;

use pn_core::{NodeId, PnResult, Real, SelectorId};

use crate::graph::{
    InitialState, NodeKind, ResourceNode, Selector, SelectorPosition, Topology,
};
use crate::indexing;
use crate::validate;

/// Builder for constructing a topology incrementally.
///
/// Use the `add_*` methods to declare nodes (declaration order is also the
/// tie-break order for parallel feeds), then call `build()` to validate and
/// freeze it into an immutable `Topology`.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    nodes: Vec<ResourceNode>,
    selectors: Vec<Selector>,
}

impl TopologyBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node of any kind with no upstream references yet.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(ResourceNode {
            id,
            name: name.into(),
            kind,
            upstream: Vec::new(),
            initial: InitialState::default(),
        });
        id
    }

    /// Append `upstream` to the feed list of `node`.
    ///
    /// Unknown ids are kept and reported by `build()`.
    pub fn connect(&mut self, upstream: NodeId, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(node.slot()) {
            n.upstream.push(upstream);
        }
    }

    pub fn add_source(&mut self, name: impl Into<String>, nominal_level: Real) -> NodeId {
        self.add_node(name, NodeKind::Source { nominal_level })
    }

    pub fn add_breaker(&mut self, name: impl Into<String>, upstream: &[NodeId]) -> NodeId {
        let id = self.add_node(name, NodeKind::Breaker { capacity: None });
        self.connect_all(upstream, id);
        id
    }

    pub fn add_bus(&mut self, name: impl Into<String>, upstream: &[NodeId]) -> NodeId {
        let id = self.add_node(name, NodeKind::Bus);
        self.connect_all(upstream, id);
        id
    }

    pub fn add_tie(&mut self, name: impl Into<String>, a: NodeId, b: NodeId) -> NodeId {
        self.add_node(name, NodeKind::Tie { sides: [a, b] })
    }

    pub fn add_converter(&mut self, name: impl Into<String>, upstream: NodeId) -> NodeId {
        let id = self.add_node(name, NodeKind::Converter);
        self.connect(upstream, id);
        id
    }

    pub fn add_load(&mut self, name: impl Into<String>, upstream: &[NodeId]) -> NodeId {
        let id = self.add_node(name, NodeKind::Load { demand: 0.0 });
        self.connect_all(upstream, id);
        id
    }

    /// Set a breaker's trip rating. No effect on other kinds.
    pub fn set_capacity(&mut self, breaker: NodeId, capacity: Real) {
        if let Some(NodeKind::Breaker { capacity: c }) =
            self.nodes.get_mut(breaker.slot()).map(|n| &mut n.kind)
        {
            *c = Some(capacity);
        }
    }

    /// Set a load's demand. No effect on other kinds.
    pub fn set_demand(&mut self, load: NodeId, demand: Real) {
        if let Some(NodeKind::Load { demand: d }) =
            self.nodes.get_mut(load.slot()).map(|n| &mut n.kind)
        {
            *d = demand;
        }
    }

    pub fn set_initial(&mut self, node: NodeId, initial: InitialState) {
        if let Some(n) = self.nodes.get_mut(node.slot()) {
            n.initial = initial;
        }
    }

    /// Declare a selector switch. Positions are `(name, members)` pairs.
    pub fn add_selector(
        &mut self,
        name: impl Into<String>,
        positions: Vec<(String, Vec<NodeId>)>,
    ) -> SelectorId {
        let id = SelectorId::from_index(self.selectors.len() as u32);
        self.selectors.push(Selector {
            id,
            name: name.into(),
            positions: positions
                .into_iter()
                .map(|(name, members)| SelectorPosition { name, members })
                .collect(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build and validate the topology, returning an immutable `Topology`.
    ///
    /// This performs validation, constructs compact downstream adjacency and
    /// fixes the evaluation order.
    pub fn build(self) -> PnResult<Topology> {
        let names = validate::validate_structure(&self.nodes)?;
        validate::validate_parameters(&self.nodes)?;
        validate::validate_selectors(&self.nodes, &self.selectors)?;

        let (downstream_offsets, downstream) = Self::build_adjacency(&self.nodes);
        let order = indexing::eval_order(&self.nodes, &downstream_offsets, &downstream)?;

        let ties = self
            .nodes
            .iter()
            .filter(|n| n.kind.is_tie())
            .map(|n| n.id)
            .collect();
        let loads = self
            .nodes
            .iter()
            .filter(|n| n.kind.is_load())
            .map(|n| n.id)
            .collect();

        Ok(Topology {
            nodes: self.nodes,
            selectors: self.selectors,
            names,
            downstream_offsets,
            downstream,
            order,
            ties,
            loads,
        })
    }

    fn connect_all(&mut self, upstream: &[NodeId], node: NodeId) {
        for &u in upstream {
            self.connect(u, node);
        }
    }

    /// Build compact adjacency lists: for each node, collect its dependents.
    fn build_adjacency(nodes: &[ResourceNode]) -> (Vec<usize>, Vec<NodeId>) {
        // Group dependents by upstream node
        let mut dependents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in nodes {
            for &up in &node.upstream {
                dependents.entry(up).or_default().push(node.id);
            }
        }

        // Sort each list for determinism
        for list in dependents.values_mut() {
            list.sort();
            list.dedup();
        }

        // Build offsets and flat list
        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut flat = Vec::new();
        offsets.push(0);

        for node in nodes {
            if let Some(list) = dependents.get(&node.id) {
                flat.extend_from_slice(list);
            }
            offsets.push(flat.len());
        }

        (offsets, flat)
    }
}
