//! Persistence boundary.
//!
//! A snapshot holds only operator and failure inputs, keyed by node name.
//! Derived availability is never saved; restoring always re-evaluates before
//! anything can be queried.

use pn_core::{PnError, PnResult};
use pn_graph::NodeKind;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::network::Network;
use crate::state::{NodeState, StateTable};

/// Saved inputs of one node. Kind-specific fields are omitted for other kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNode {
    pub name: String,
    #[serde(default)]
    pub commanded_open: bool,
    #[serde(default)]
    pub failed_open: bool,
    #[serde(default)]
    pub failed_closed: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tripped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engaged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Inputs of every node at one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StateSnapshot {
    pub tick: u64,
    pub nodes: Vec<SavedNode>,
}

impl StateSnapshot {
    pub fn get(&self, name: &str) -> Option<&SavedNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

impl Network {
    /// Capture every node's inputs.
    pub fn snapshot(&self) -> StateSnapshot {
        let nodes = self
            .topology()
            .nodes()
            .iter()
            .zip(self.states().iter())
            .map(|(node, (_, s))| SavedNode {
                name: node.name.clone(),
                commanded_open: s.commanded_open(),
                failed_open: s.failed_open(),
                failed_closed: s.failed_closed(),
                tripped: s.tripped(),
                depleted: node.kind.is_source().then_some(s.depleted()),
                engaged: node.kind.is_tie().then_some(s.engaged()),
                active: node.kind.is_converter().then_some(s.active()),
            })
            .collect();
        StateSnapshot {
            tick: self.tick(),
            nodes,
        }
    }

    /// Replace all inputs with a snapshot's, atomically, then re-evaluate.
    ///
    /// Nodes the snapshot does not mention return to their declared initial
    /// state. Any unknown name, kind mismatch or contradictory failure rejects
    /// the whole snapshot and leaves the network untouched. Commands posted
    /// before the restore are discarded, as are scheduled faults due at or
    /// before the snapshot's tick: their effect is already in the snapshot.
    pub fn restore(&mut self, snapshot: &StateSnapshot) -> PnResult<()> {
        let mut table = StateTable::new(self.topology());
        let mut seen = vec![false; table.len()];

        for saved in &snapshot.nodes {
            let id = self.topology().id_of(&saved.name)?;
            if std::mem::replace(&mut seen[id.slot()], true) {
                return Err(PnError::InvalidArg {
                    what: "snapshot names a node twice",
                });
            }
            let node = self.topology().try_node(id)?;
            apply_saved(&node.kind, &node.name, saved, table.get_mut(id)?)?;
        }

        let discarded = self.discard_pending_commands();
        let faults_dropped = self.schedule_mut().discard_through(snapshot.tick);
        self.reset_states(table, snapshot.tick);
        self.evaluate();
        info!(
            tick = snapshot.tick,
            nodes = snapshot.nodes.len(),
            discarded,
            faults_dropped,
            "network state restored"
        );
        Ok(())
    }
}

fn apply_saved(
    kind: &NodeKind,
    name: &str,
    saved: &SavedNode,
    state: &mut NodeState,
) -> PnResult<()> {
    if saved.failed_open && saved.failed_closed {
        return Err(PnError::InvalidArg {
            what: "node cannot be failed open and failed closed at once",
        });
    }
    let wrong = |expected| PnError::WrongKind {
        name: name.to_string(),
        expected,
        actual: kind.label(),
    };

    state.commanded_open = saved.commanded_open;
    state.tripped = saved.tripped;
    state.clear_failure();
    if saved.failed_open {
        state.set_failed_open();
    }
    if saved.failed_closed {
        state.set_failed_closed();
    }
    if let Some(depleted) = saved.depleted {
        if !kind.is_source() {
            return Err(wrong("source"));
        }
        state.depleted = depleted;
    }
    if let Some(engaged) = saved.engaged {
        if !kind.is_tie() {
            return Err(wrong("tie"));
        }
        state.engaged = engaged;
    }
    if let Some(active) = saved.active {
        if !kind.is_converter() {
            return Err(wrong("converter"));
        }
        state.active = active;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faults::FaultAction;
    use crate::query::NetworkView;
    use pn_graph::TopologyBuilder;
    use std::sync::Arc;

    fn network() -> Network {
        let mut b = TopologyBuilder::new();
        let bat = b.add_source("BAT", 28.0);
        let a = b.add_bus("A", &[bat]);
        let bus_b = b.add_bus("B", &[]);
        b.add_tie("TIE", a, bus_b);
        let inv = b.add_converter("INV", bus_b);
        let ac = b.add_bus("AC", &[inv]);
        b.add_load("LAMP", &[ac]);
        Network::new(Arc::new(b.build().unwrap()))
    }

    #[test]
    fn snapshot_omits_fields_of_other_kinds() {
        let net = network();
        let snap = net.snapshot();
        let bat = snap.get("BAT").unwrap();
        assert_eq!(bat.depleted, Some(false));
        assert_eq!(bat.engaged, None);
        assert_eq!(snap.get("TIE").unwrap().engaged, Some(false));
        assert_eq!(snap.get("INV").unwrap().active, Some(true));

        let json = serde_json::to_string(bat).unwrap();
        assert!(!json.contains("engaged"));
        assert!(!json.contains("tripped"));
    }

    #[test]
    fn restore_evaluates_immediately() {
        let mut net = network();
        let tie = net.resolve("TIE").unwrap();
        net.set_engaged(tie, true).unwrap();
        net.step();
        let snap = net.snapshot();
        assert!(net.query_named("LAMP").unwrap().available);

        let mut fresh = network();
        fresh.restore(&snap).unwrap();
        assert_eq!(fresh.tick(), 1);
        assert!(fresh.query_named("LAMP").unwrap().available);
        assert!(fresh.states().same_outputs(net.states()));
    }

    #[test]
    fn bad_snapshot_leaves_state_untouched() {
        let mut net = network();
        net.step();
        let before = net.snapshot();

        let mut snap = before.clone();
        snap.nodes[0].commanded_open = true;
        snap.nodes.push(SavedNode {
            name: "NOT_WIRED".into(),
            commanded_open: false,
            failed_open: false,
            failed_closed: false,
            tripped: false,
            depleted: None,
            engaged: None,
            active: None,
        });
        assert!(net.restore(&snap).unwrap_err().is_lookup());
        assert_eq!(net.snapshot(), before);

        let mut snap = before.clone();
        snap.nodes[1].engaged = Some(true);
        assert!(matches!(
            net.restore(&snap).unwrap_err(),
            PnError::WrongKind { .. }
        ));

        let mut snap = before;
        snap.nodes[0].failed_open = true;
        snap.nodes[0].failed_closed = true;
        assert!(net.restore(&snap).is_err());
    }

    #[test]
    fn restore_skips_faults_already_fired() {
        let mut net = network();
        let bat = net.resolve("BAT").unwrap();
        let tie = net.resolve("TIE").unwrap();
        net.set_engaged(tie, true).unwrap();
        net.schedule_fault(2, bat, FaultAction::Deplete).unwrap();
        net.schedule_fault(5, bat, FaultAction::Deplete).unwrap();
        for _ in 0..2 {
            net.step();
        }
        net.restore_source(bat).unwrap();
        net.step();
        let snap = net.snapshot();

        let mut fresh = network();
        fresh.schedule_fault(2, bat, FaultAction::Deplete).unwrap();
        fresh.schedule_fault(5, bat, FaultAction::Deplete).unwrap();
        fresh.restore(&snap).unwrap();
        assert_eq!(fresh.schedule().len(), 1);

        fresh.step();
        net.step();
        assert!(fresh.query_named("LAMP").unwrap().available);
        assert!(fresh.states().same_outputs(net.states()));

        fresh.step();
        net.step();
        assert!(!fresh.query_named("LAMP").unwrap().available);
        assert!(fresh.states().same_outputs(net.states()));
    }

    #[test]
    fn missing_nodes_return_to_initial_state() {
        let mut net = network();
        let bat = net.resolve("BAT").unwrap();
        net.deplete(bat).unwrap();
        net.restore(&StateSnapshot::default()).unwrap();
        assert!(!net.state(bat).unwrap().depleted());
        assert_eq!(net.tick(), 0);
    }
}
