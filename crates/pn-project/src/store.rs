//! Saved-state files.
//!
//! A state file wraps a [`StateSnapshot`] with the fingerprint of the
//! topology it was taken from. Restoring onto different wiring is refused.

use std::fs;
use std::path::Path;

use pn_sim::{Network, StateSnapshot};
use serde::{Deserialize, Serialize};

use crate::hash::topology_fingerprint;
use crate::schema::TopologyDef;
use crate::{ProjectError, ProjectResult};

pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub format_version: u32,
    /// Name of the topology at save time (informational).
    pub topology: String,
    pub fingerprint: String,
    /// RFC 3339 save time.
    pub saved_at: String,
    pub snapshot: StateSnapshot,
}

impl StateFile {
    /// Capture the network's current inputs.
    pub fn capture(def: &TopologyDef, network: &Network) -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            topology: def.name.clone(),
            fingerprint: topology_fingerprint(def),
            saved_at: chrono::Utc::now().to_rfc3339(),
            snapshot: network.snapshot(),
        }
    }

    /// Check that this file can be applied to `def`.
    pub fn check(&self, def: &TopologyDef) -> ProjectResult<()> {
        if self.format_version != STATE_FORMAT_VERSION {
            return Err(ProjectError::UnsupportedStateVersion {
                version: self.format_version,
            });
        }
        let expected = topology_fingerprint(def);
        if self.fingerprint != expected {
            return Err(ProjectError::FingerprintMismatch {
                expected,
                found: self.fingerprint.clone(),
            });
        }
        Ok(())
    }

    /// Restore the saved inputs onto `network`, which must be built from `def`.
    pub fn apply(&self, def: &TopologyDef, network: &mut Network) -> ProjectResult<()> {
        self.check(def)?;
        network.restore(&self.snapshot)?;
        Ok(())
    }
}

pub fn save_state(path: &Path, state: &StateFile) -> ProjectResult<()> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_state(path: &Path) -> ProjectResult<StateFile> {
    let content = fs::read_to_string(path)?;
    let state = serde_json::from_str(&content)?;
    Ok(state)
}
