//! Topology validation logic.

use std::collections::HashMap;

use pn_core::{NodeId, ensure_non_negative, ensure_positive};

use crate::error::TopologyError;
use crate::graph::{NodeKind, ResourceNode, Selector};

/// Validate references and kind rules; returns the name index on success.
pub(crate) fn validate_structure(
    nodes: &[ResourceNode],
) -> Result<HashMap<String, NodeId>, TopologyError> {
    // Check that node IDs are contiguous and names unique
    let mut names = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        debug_assert_eq!(node.id.slot(), i);
        if names.insert(node.name.clone(), node.id).is_some() {
            return Err(TopologyError::DuplicateName {
                name: node.name.clone(),
            });
        }
    }

    let lookup = |from: &ResourceNode, target: NodeId| {
        nodes
            .get(target.slot())
            .ok_or_else(|| TopologyError::DanglingReference {
                node: from.name.clone(),
                target,
            })
    };

    for node in nodes {
        // Every upstream reference must exist and be able to feed
        for &up in &node.upstream {
            let upstream = lookup(node, up)?;
            if upstream.kind.is_tie() || upstream.kind.is_load() {
                return Err(TopologyError::InvalidUpstream {
                    node: node.name.clone(),
                    upstream: upstream.name.clone(),
                    kind: upstream.kind.label(),
                });
            }
        }

        match &node.kind {
            NodeKind::Source { .. } | NodeKind::Tie { .. } if !node.upstream.is_empty() => {
                return Err(TopologyError::UpstreamNotAllowed {
                    node: node.name.clone(),
                    kind: node.kind.label(),
                });
            }
            NodeKind::Tie { sides } => {
                let a = lookup(node, sides[0])?;
                let b = lookup(node, sides[1])?;
                if a.id == b.id {
                    return Err(TopologyError::InvalidTie {
                        tie: node.name.clone(),
                        reason: "both sides reference the same bus",
                    });
                }
                if !a.kind.is_bus() || !b.kind.is_bus() {
                    return Err(TopologyError::InvalidTie {
                        tie: node.name.clone(),
                        reason: "both sides must be buses",
                    });
                }
            }
            NodeKind::Load { .. } if node.upstream.is_empty() => {
                return Err(TopologyError::MissingUpstream {
                    node: node.name.clone(),
                });
            }
            NodeKind::Converter => {
                if node.upstream.is_empty() {
                    return Err(TopologyError::MissingUpstream {
                        node: node.name.clone(),
                    });
                }
                if node.upstream.len() != 1 || !nodes[node.upstream[0].slot()].kind.is_bus() {
                    return Err(TopologyError::InvalidConverter {
                        node: node.name.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(names)
}

/// Validate numeric parameters.
pub(crate) fn validate_parameters(nodes: &[ResourceNode]) -> Result<(), TopologyError> {
    for node in nodes {
        let bad = |what| TopologyError::InvalidParameter {
            node: node.name.clone(),
            what,
        };
        match node.kind {
            NodeKind::Source { nominal_level } => {
                ensure_positive(nominal_level, "nominal level").map_err(|_| bad("nominal level"))?;
            }
            NodeKind::Breaker {
                capacity: Some(capacity),
            } => {
                ensure_non_negative(capacity, "capacity").map_err(|_| bad("capacity"))?;
            }
            NodeKind::Load { demand } => {
                ensure_non_negative(demand, "demand").map_err(|_| bad("demand"))?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Validate selector switches: unique names, at least one position, members
/// that exist and are converters or breakers.
pub(crate) fn validate_selectors(
    nodes: &[ResourceNode],
    selectors: &[Selector],
) -> Result<(), TopologyError> {
    for (i, selector) in selectors.iter().enumerate() {
        let bad = |reason: String| TopologyError::InvalidSelector {
            selector: selector.name.clone(),
            reason,
        };
        if selectors[..i].iter().any(|s| s.name == selector.name) {
            return Err(bad("name is used more than once".to_string()));
        }
        if selector.positions.is_empty() {
            return Err(bad("has no positions".to_string()));
        }
        for (j, position) in selector.positions.iter().enumerate() {
            if selector.positions[..j]
                .iter()
                .any(|p| p.name == position.name)
            {
                return Err(bad(format!("position '{}' is duplicated", position.name)));
            }
            for &member in &position.members {
                let node = nodes
                    .get(member.slot())
                    .ok_or_else(|| bad(format!("member {} does not exist", member)))?;
                if !node.kind.is_converter() && !node.kind.is_breaker() {
                    return Err(bad(format!(
                        "member '{}' is a {}, expected converter or breaker",
                        node.name,
                        node.kind.label()
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InitialState;
    use pn_core::Id;

    fn node(index: u32, name: &str, kind: NodeKind, upstream: &[u32]) -> ResourceNode {
        ResourceNode {
            id: Id::from_index(index),
            name: name.into(),
            kind,
            upstream: upstream.iter().map(|&i| Id::from_index(i)).collect(),
            initial: InitialState::default(),
        }
    }

    #[test]
    fn validate_empty_topology() {
        assert!(validate_structure(&[]).is_ok());
    }

    #[test]
    fn validate_dangling_reference() {
        let nodes = vec![node(0, "BUS", NodeKind::Bus, &[99])];
        let result = validate_structure(&nodes);
        assert!(matches!(
            result.unwrap_err(),
            TopologyError::DanglingReference { .. }
        ));
    }

    #[test]
    fn validate_tie_to_non_bus() {
        let nodes = vec![
            node(0, "BAT", NodeKind::Source { nominal_level: 28.0 }, &[]),
            node(1, "BUS", NodeKind::Bus, &[0]),
            node(
                2,
                "TIE",
                NodeKind::Tie {
                    sides: [Id::from_index(0), Id::from_index(1)],
                },
                &[],
            ),
        ];
        assert!(matches!(
            validate_structure(&nodes).unwrap_err(),
            TopologyError::InvalidTie { .. }
        ));
    }

    #[test]
    fn validate_load_cannot_feed() {
        let nodes = vec![
            node(0, "BAT", NodeKind::Source { nominal_level: 28.0 }, &[]),
            node(1, "LOAD", NodeKind::Load { demand: 0.0 }, &[0]),
            node(2, "BUS", NodeKind::Bus, &[1]),
        ];
        assert!(matches!(
            validate_structure(&nodes).unwrap_err(),
            TopologyError::InvalidUpstream { .. }
        ));
    }

    #[test]
    fn validate_bad_parameters() {
        let nodes = vec![node(0, "BAT", NodeKind::Source { nominal_level: 0.0 }, &[])];
        assert!(validate_parameters(&nodes).is_err());

        let nodes = vec![node(
            0,
            "CB",
            NodeKind::Breaker {
                capacity: Some(f64::NAN),
            },
            &[],
        )];
        assert!(validate_parameters(&nodes).is_err());
    }
}
