//! pn-project: topology file format, validation and saved-state files.

pub mod hash;
pub mod network;
pub mod reference;
pub mod schema;
pub mod store;
pub mod validate;

pub use hash::topology_fingerprint;
pub use network::{build_network, build_topology};
pub use schema::*;
pub use store::{STATE_FORMAT_VERSION, StateFile, load_state, save_state};
pub use validate::{ValidationError, validate_topology_def};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] pn_core::PnError),

    #[error("Saved state was taken from different wiring (expected {expected}, found {found})")]
    FingerprintMismatch { expected: String, found: String },

    #[error("Unsupported state file version: {version}")]
    UnsupportedStateVersion { version: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<TopologyDef> {
    let content = std::fs::read_to_string(path)?;
    parse_yaml(&content)
}

pub fn parse_yaml(content: &str) -> ProjectResult<TopologyDef> {
    let def: TopologyDef = serde_yaml::from_str(content)?;
    validate_topology_def(&def)?;
    Ok(def)
}

pub fn save_yaml(path: &std::path::Path, def: &TopologyDef) -> ProjectResult<()> {
    validate_topology_def(def)?;
    let content = serde_yaml::to_string(def)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<TopologyDef> {
    let content = std::fs::read_to_string(path)?;
    let def: TopologyDef = serde_json::from_str(&content)?;
    validate_topology_def(&def)?;
    Ok(def)
}

pub fn save_json(path: &std::path::Path, def: &TopologyDef) -> ProjectResult<()> {
    validate_topology_def(def)?;
    let content = serde_json::to_string_pretty(def)?;
    std::fs::write(path, content)?;
    Ok(())
}
