//! Content-based topology fingerprints.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::schema::{NodeDef, SelectorDef, TopologyDef};

#[derive(Serialize)]
struct Wiring<'a> {
    nodes: &'a [NodeDef],
    selectors: &'a [SelectorDef],
}

/// SHA-256 over the wiring (nodes and selectors) of a topology.
///
/// The display name, format version and scripted faults do not take part, so
/// a saved state stays valid when only those change.
pub fn topology_fingerprint(def: &TopologyDef) -> String {
    let wiring = Wiring {
        nodes: &def.nodes,
        selectors: &def.selectors,
    };

    let mut hasher = Sha256::new();
    let wiring_json = serde_json::to_string(&wiring).unwrap_or_default();
    hasher.update(wiring_json.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
