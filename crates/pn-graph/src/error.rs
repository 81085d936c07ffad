//! Topology-specific error types.

use pn_core::{NodeId, PnError};

/// Topology construction and validation errors.
///
/// Every variant is a wiring defect: fatal at startup, never a runtime condition.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// Two nodes share a name.
    DuplicateName { name: String },

    /// A node refers to an id that doesn't exist.
    DanglingReference { node: String, target: NodeId },

    /// A tie does not join two distinct buses.
    InvalidTie { tie: String, reason: &'static str },

    /// A node of this kind may not have upstream references.
    UpstreamNotAllowed { node: String, kind: &'static str },

    /// A tie or load was named as somebody's upstream.
    InvalidUpstream {
        node: String,
        upstream: String,
        kind: &'static str,
    },

    /// A load or converter has nothing to draw from.
    MissingUpstream { node: String },

    /// A converter must draw from exactly one bus.
    InvalidConverter { node: String },

    /// The non-tie edges form a cycle through these nodes.
    Cycle { nodes: Vec<String> },

    /// A numeric parameter is out of range.
    InvalidParameter { node: String, what: &'static str },

    /// A selector is malformed.
    InvalidSelector { selector: String, reason: String },
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::DuplicateName { name } => {
                write!(f, "Node name '{}' is used more than once", name)
            }
            TopologyError::DanglingReference { node, target } => {
                write!(f, "Node '{}' refers to non-existent node {}", node, target)
            }
            TopologyError::InvalidTie { tie, reason } => {
                write!(f, "Tie '{}' is invalid: {}", tie, reason)
            }
            TopologyError::UpstreamNotAllowed { node, kind } => {
                write!(f, "Node '{}' is a {} and cannot have upstream references", node, kind)
            }
            TopologyError::InvalidUpstream {
                node,
                upstream,
                kind,
            } => {
                write!(
                    f,
                    "Node '{}' draws from '{}', but a {} cannot feed other nodes",
                    node, upstream, kind
                )
            }
            TopologyError::MissingUpstream { node } => {
                write!(f, "Node '{}' has no upstream reference", node)
            }
            TopologyError::InvalidConverter { node } => {
                write!(f, "Converter '{}' must draw from exactly one bus", node)
            }
            TopologyError::Cycle { nodes } => {
                write!(f, "Wiring contains a cycle through: {}", nodes.join(", "))
            }
            TopologyError::InvalidParameter { node, what } => {
                write!(f, "Node '{}' has an invalid {}", node, what)
            }
            TopologyError::InvalidSelector { selector, reason } => {
                write!(f, "Selector '{}' is invalid: {}", selector, reason)
            }
        }
    }
}

impl std::error::Error for TopologyError {}

impl From<TopologyError> for PnError {
    fn from(err: TopologyError) -> Self {
        PnError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_configuration_error() {
        let err: PnError = TopologyError::MissingUpstream {
            node: "LOAD".into(),
        }
        .into();
        match err {
            PnError::Configuration { message } => assert!(message.contains("LOAD")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
