//! Topology file validation.
//!
//! Catches what can be checked by name before anything is built: duplicate
//! names, dangling references and out-of-range numbers. Kind rules (what may
//! feed what) and cycles are left to `pn_graph::TopologyBuilder`.

use std::collections::{HashMap, HashSet};

use pn_sim::FaultAction;

use crate::schema::{FORMAT_VERSION, NodeDef, NodeKindDef, TopologyDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_topology_def(def: &TopologyDef) -> Result<(), ValidationError> {
    if def.version == 0 || def.version > FORMAT_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: def.version,
        });
    }

    let mut kinds: HashMap<&str, &NodeKindDef> = HashMap::new();
    for node in &def.nodes {
        if kinds.insert(node.name.as_str(), &node.kind).is_some() {
            return Err(ValidationError::DuplicateName {
                name: node.name.clone(),
                context: format!("topology '{}' nodes", def.name),
            });
        }
        validate_node(node)?;
    }

    for node in &def.nodes {
        for upstream in &node.upstream {
            require(&kinds, upstream, || format!("node '{}' upstream", node.name))?;
        }
        if let NodeKindDef::Tie { sides } = &node.kind {
            for side in sides {
                require(&kinds, side, || format!("tie '{}' sides", node.name))?;
            }
        }
    }

    let mut selector_names = HashSet::new();
    for selector in &def.selectors {
        if !selector_names.insert(selector.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: selector.name.clone(),
                context: "selectors".to_string(),
            });
        }
        if selector.positions.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("selector '{}' positions", selector.name),
                value: "[]".to_string(),
                reason: "at least one position is required".to_string(),
            });
        }
        let mut positions = HashSet::new();
        for position in &selector.positions {
            if !positions.insert(position.name.as_str()) {
                return Err(ValidationError::DuplicateName {
                    name: position.name.clone(),
                    context: format!("selector '{}' positions", selector.name),
                });
            }
            for member in &position.members {
                require(&kinds, member, || {
                    format!("selector '{}' position '{}'", selector.name, position.name)
                })?;
            }
        }
    }

    for fault in &def.faults {
        let kind = require(&kinds, &fault.node, || "faults".to_string())?;
        let source_only = matches!(fault.action, FaultAction::Deplete | FaultAction::Restore);
        if source_only && !matches!(kind, NodeKindDef::Source { .. }) {
            return Err(ValidationError::InvalidValue {
                field: format!("fault on '{}' at tick {}", fault.node, fault.tick),
                value: format!("{:?}", fault.action),
                reason: format!("only sources can be depleted, '{}' is a {}", fault.node, kind.label()),
            });
        }
    }

    Ok(())
}

fn require<'a>(
    kinds: &HashMap<&str, &'a NodeKindDef>,
    name: &str,
    context: impl FnOnce() -> String,
) -> Result<&'a NodeKindDef, ValidationError> {
    kinds
        .get(name)
        .copied()
        .ok_or_else(|| ValidationError::MissingReference {
            name: name.to_string(),
            context: context(),
        })
}

fn validate_node(node: &NodeDef) -> Result<(), ValidationError> {
    match &node.kind {
        NodeKindDef::Source { nominal_level } => {
            if !nominal_level.is_finite() || *nominal_level <= 0.0 {
                return Err(invalid(node, "nominal_level", *nominal_level, "must be positive"));
            }
        }
        NodeKindDef::Breaker {
            capacity: Some(capacity),
        } => {
            if !capacity.is_finite() || *capacity < 0.0 {
                return Err(invalid(node, "capacity", *capacity, "must be non-negative"));
            }
        }
        NodeKindDef::Load { demand } => {
            if !demand.is_finite() || *demand < 0.0 {
                return Err(invalid(node, "demand", *demand, "must be non-negative"));
            }
        }
        _ => {}
    }

    if let Some(initial) = &node.initial {
        let misplaced = match node.kind {
            NodeKindDef::Source { .. } | NodeKindDef::Breaker { .. } => {
                initial.engaged.is_some() || initial.active.is_some()
            }
            NodeKindDef::Tie { .. } => initial.commanded_open.is_some() || initial.active.is_some(),
            NodeKindDef::Converter => {
                initial.commanded_open.is_some() || initial.engaged.is_some()
            }
            NodeKindDef::Bus | NodeKindDef::Load { .. } => {
                initial.commanded_open.is_some()
                    || initial.engaged.is_some()
                    || initial.active.is_some()
            }
        };
        if misplaced {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.initial", node.name),
                value: format!("{:?}", initial),
                reason: format!("field does not apply to a {}", node.kind.label()),
            });
        }
    }

    Ok(())
}

fn invalid(node: &NodeDef, field: &str, value: f64, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: format!("{}.{}", node.name, field),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
