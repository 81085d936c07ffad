//! Evaluation ordering.
//!
//! The evaluator walks nodes in a source-to-load order fixed once here, so no
//! per-tick sort is needed.

use std::collections::BTreeSet;

use pn_core::NodeId;

use crate::error::TopologyError;
use crate::graph::ResourceNode;

/// Stable topological order over every non-tie node.
///
/// Kahn's algorithm, always taking the lowest ready id, so nodes that are not
/// ordered by wiring keep their declaration order. Fails with
/// `TopologyError::Cycle` if the upstream edges are not acyclic.
pub(crate) fn eval_order(
    nodes: &[ResourceNode],
    downstream_offsets: &[usize],
    downstream: &[NodeId],
) -> Result<Vec<NodeId>, TopologyError> {
    let mut in_degree: Vec<usize> = nodes.iter().map(|n| distinct(&n.upstream)).collect();

    let mut ready: BTreeSet<NodeId> = nodes
        .iter()
        .filter(|n| !n.kind.is_tie() && in_degree[n.id.slot()] == 0)
        .map(|n| n.id)
        .collect();

    let expected = nodes.iter().filter(|n| !n.kind.is_tie()).count();
    let mut order = Vec::with_capacity(expected);

    while let Some(id) = ready.pop_first() {
        order.push(id);
        let start = downstream_offsets[id.slot()];
        let end = downstream_offsets[id.slot() + 1];
        for &dep in &downstream[start..end] {
            let d = &mut in_degree[dep.slot()];
            *d -= 1;
            if *d == 0 {
                ready.insert(dep);
            }
        }
    }

    if order.len() != expected {
        let nodes = nodes
            .iter()
            .filter(|n| !n.kind.is_tie() && in_degree[n.id.slot()] > 0)
            .map(|n| n.name.clone())
            .collect();
        return Err(TopologyError::Cycle { nodes });
    }

    Ok(order)
}

/// Number of distinct ids in an upstream list (duplicates count once, matching
/// the deduplicated adjacency).
fn distinct(list: &[NodeId]) -> usize {
    list.iter()
        .enumerate()
        .filter(|(i, id)| !list[..*i].contains(id))
        .count()
}

#[cfg(test)]
mod tests {
    use crate::builder::TopologyBuilder;
    use pn_core::PnError;

    #[test]
    fn order_respects_wiring() {
        let mut builder = TopologyBuilder::new();
        let load = builder.add_node("LOAD", crate::NodeKind::Load { demand: 0.0 });
        let bus = builder.add_bus("BUS", &[]);
        let bat = builder.add_source("BAT", 28.0);
        builder.connect(bat, bus);
        builder.connect(bus, load);

        let topo = builder.build().unwrap();
        assert_eq!(topo.eval_order(), &[bat, bus, load]);
    }

    #[test]
    fn independent_nodes_keep_declaration_order() {
        let mut builder = TopologyBuilder::new();
        let a = builder.add_source("A", 28.0);
        let b = builder.add_source("B", 28.0);
        let bus_b = builder.add_bus("BUS_B", &[b]);
        let bus_a = builder.add_bus("BUS_A", &[a]);

        let topo = builder.build().unwrap();
        assert_eq!(topo.eval_order(), &[a, b, bus_b, bus_a]);
    }

    #[test]
    fn ties_are_not_ordered() {
        let mut builder = TopologyBuilder::new();
        let a = builder.add_bus("A", &[]);
        let b = builder.add_bus("B", &[]);
        let tie = builder.add_tie("TIE", a, b);

        let topo = builder.build().unwrap();
        assert_eq!(topo.eval_order(), &[a, b]);
        assert_eq!(topo.ties(), &[tie]);
    }

    #[test]
    fn duplicate_upstream_is_harmless() {
        let mut builder = TopologyBuilder::new();
        let bat = builder.add_source("BAT", 28.0);
        let bus = builder.add_bus("BUS", &[bat, bat]);
        let topo = builder.build().unwrap();
        assert_eq!(topo.eval_order(), &[bat, bus]);
    }

    #[test]
    fn cycle_is_a_configuration_error() {
        let mut builder = TopologyBuilder::new();
        let a = builder.add_bus("A", &[]);
        let b = builder.add_breaker("B", &[a]);
        builder.connect(b, a);

        let err = builder.build().unwrap_err();
        match err {
            PnError::Configuration { message } => {
                assert!(message.contains("cycle"));
                assert!(message.contains('A'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
