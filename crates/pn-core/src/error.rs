use thiserror::Error;

use crate::ids::NodeId;

pub type PnResult<T> = Result<T, PnError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PnError {
    /// Malformed wiring. Fatal at construction, never retried.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown node: {name}")]
    Lookup { name: String },

    #[error("Unknown node id: {id}")]
    UnknownId { id: NodeId },

    #[error("Node {name} is a {actual}, expected {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Network has not been evaluated since construction or restore")]
    NotEvaluated,

    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

impl PnError {
    pub fn lookup(name: impl Into<String>) -> Self {
        PnError::Lookup { name: name.into() }
    }

    /// True for errors that indicate a caller passed a bad node reference.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            PnError::Lookup { .. } | PnError::UnknownId { .. } | PnError::WrongKind { .. }
        )
    }
}
