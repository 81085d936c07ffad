//! Fault/failure injection.
//!
//! The setters here are the only code allowed to change failure flags or
//! source depletion. All of them are idempotent and take effect on the next
//! step. Scripted failures can also be queued against a future tick.

use pn_core::{NodeId, PnResult};
use pn_graph::NodeKind;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::network::Network;
use crate::state::expect_kind;

/// A failure (or repair) applied to one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultAction {
    /// Stuck open: never conducts, whatever the commanded position.
    FailOpen,
    /// Stuck closed: always conducts (a shorted tie stays engaged).
    FailClosed,
    /// Remove either failure.
    Clear,
    /// Exhaust a source.
    Deplete,
    /// Recharge or replace a source.
    Restore,
}

/// A fault due at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledFault {
    pub tick: u64,
    pub node: NodeId,
    pub action: FaultAction,
}

/// Pending scripted faults, kept in tick order (insertion order within a tick).
#[derive(Debug, Clone, Default)]
pub struct FaultSchedule {
    entries: Vec<ScheduledFault>,
}

impl FaultSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fault: ScheduledFault) {
        let at = self.entries.partition_point(|e| e.tick <= fault.tick);
        self.entries.insert(at, fault);
    }

    /// Remove and return every fault due at or before `tick`.
    pub fn take_due(&mut self, tick: u64) -> Vec<ScheduledFault> {
        let split = self.entries.partition_point(|e| e.tick <= tick);
        self.entries.drain(..split).collect()
    }

    /// Drop every fault due at or before `tick` without firing it.
    pub fn discard_through(&mut self, tick: u64) -> usize {
        self.take_due(tick).len()
    }

    pub fn pending(&self) -> &[ScheduledFault] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Network {
    /// Stick a node open. Clears a stuck-closed failure.
    pub fn set_failed_open(&mut self, node: NodeId) -> PnResult<()> {
        self.states_mut().get_mut(node)?.set_failed_open();
        Ok(())
    }

    /// Stick a node closed. Clears a stuck-open failure.
    pub fn set_failed_closed(&mut self, node: NodeId) -> PnResult<()> {
        self.states_mut().get_mut(node)?.set_failed_closed();
        Ok(())
    }

    pub fn clear_failure(&mut self, node: NodeId) -> PnResult<()> {
        self.states_mut().get_mut(node)?.clear_failure();
        Ok(())
    }

    /// Exhaust a source. Fails for other kinds.
    pub fn deplete(&mut self, source: NodeId) -> PnResult<()> {
        self.set_depleted(source, true)
    }

    /// Undo `deplete`.
    pub fn restore_source(&mut self, source: NodeId) -> PnResult<()> {
        self.set_depleted(source, false)
    }

    fn set_depleted(&mut self, source: NodeId, depleted: bool) -> PnResult<()> {
        let node = self.topology().try_node(source)?;
        expect_kind(node, "source", NodeKind::is_source)?;
        self.states_mut().get_mut(source)?.depleted = depleted;
        Ok(())
    }

    /// Apply one fault action now (effective on the next step).
    pub fn inject(&mut self, node: NodeId, action: FaultAction) -> PnResult<()> {
        match action {
            FaultAction::FailOpen => self.set_failed_open(node),
            FaultAction::FailClosed => self.set_failed_closed(node),
            FaultAction::Clear => self.clear_failure(node),
            FaultAction::Deplete => self.deplete(node),
            FaultAction::Restore => self.restore_source(node),
        }
    }

    /// Queue a fault for the step whose tick number is `tick`.
    ///
    /// The node and the action's kind requirement are checked now, so a
    /// scheduled fault can never fail when it comes due.
    pub fn schedule_fault(&mut self, tick: u64, node: NodeId, action: FaultAction) -> PnResult<()> {
        let n = self.topology().try_node(node)?;
        if matches!(action, FaultAction::Deplete | FaultAction::Restore) {
            expect_kind(n, "source", NodeKind::is_source)?;
        }
        self.schedule_mut().push(ScheduledFault { tick, node, action });
        Ok(())
    }

    /// Apply every scheduled fault due at `tick`; returns how many fired.
    pub(crate) fn fire_due_faults(&mut self, tick: u64) -> usize {
        let due = self.schedule_mut().take_due(tick);
        let mut fired = 0;
        for fault in due {
            match self.inject(fault.node, fault.action) {
                Ok(()) => {
                    info!(
                        tick,
                        node = self.topology().name_of(fault.node),
                        action = ?fault.action,
                        "scheduled fault applied"
                    );
                    fired += 1;
                }
                Err(err) => {
                    tracing::warn!(tick, %err, "scheduled fault rejected");
                }
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault(tick: u64, index: u32) -> ScheduledFault {
        ScheduledFault {
            tick,
            node: NodeId::from_index(index),
            action: FaultAction::FailOpen,
        }
    }

    #[test]
    fn schedule_keeps_tick_then_insertion_order() {
        let mut schedule = FaultSchedule::new();
        schedule.push(fault(5, 0));
        schedule.push(fault(2, 1));
        schedule.push(fault(5, 2));
        schedule.push(fault(2, 3));

        let order: Vec<u32> = schedule.pending().iter().map(|f| f.node.index()).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn take_due_drains_past_and_present() {
        let mut schedule = FaultSchedule::new();
        schedule.push(fault(1, 0));
        schedule.push(fault(3, 1));
        schedule.push(fault(4, 2));

        assert_eq!(schedule.take_due(3).len(), 2);
        assert_eq!(schedule.len(), 1);
        assert!(schedule.take_due(3).is_empty());
        assert_eq!(schedule.take_due(10).len(), 1);
        assert!(schedule.is_empty());
    }

    #[test]
    fn discard_through_keeps_future_faults() {
        let mut schedule = FaultSchedule::new();
        schedule.push(fault(2, 0));
        schedule.push(fault(5, 1));
        schedule.push(fault(6, 2));

        assert_eq!(schedule.discard_through(5), 2);
        assert_eq!(schedule.pending(), &[fault(6, 2)]);
    }

    #[test]
    fn action_serializes_snake_case() {
        let json = serde_json::to_string(&FaultAction::FailClosed).unwrap();
        assert_eq!(json, "\"fail_closed\"");
    }
}
