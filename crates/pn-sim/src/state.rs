//! Per-node mutable state.

use pn_core::{NodeId, PnError, PnResult, Real};
use pn_graph::{NodeKind, ResourceNode, Topology};

/// Mutable state of one node.
///
/// Commanded and failure fields are inputs; `available`, `level`, `via`,
/// `tie_fed`, `through_tie` and `load` are derived by the evaluator every
/// step and are never persisted. Failure flags can only be changed through the fault injector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeState {
    pub(crate) commanded_open: bool,
    pub(crate) failed_open: bool,
    pub(crate) failed_closed: bool,
    pub(crate) depleted: bool,
    pub(crate) engaged: bool,
    pub(crate) active: bool,
    pub(crate) tripped: bool,

    pub(crate) available: bool,
    pub(crate) level: Real,
    pub(crate) via: Option<NodeId>,
    pub(crate) tie_fed: bool,
    pub(crate) through_tie: bool,
    pub(crate) load: Real,
}

impl NodeState {
    /// Fresh state for a node, taken from its declared initial state.
    pub fn initial(node: &ResourceNode) -> Self {
        Self {
            commanded_open: node.initial.commanded_open,
            failed_open: false,
            failed_closed: false,
            depleted: false,
            engaged: node.initial.engaged,
            active: node.initial.active,
            tripped: false,
            available: false,
            level: 0.0,
            via: None,
            tie_fed: false,
            through_tie: false,
            load: 0.0,
        }
    }

    pub fn commanded_open(&self) -> bool {
        self.commanded_open
    }

    pub fn failed_open(&self) -> bool {
        self.failed_open
    }

    pub fn failed_closed(&self) -> bool {
        self.failed_closed
    }

    pub fn depleted(&self) -> bool {
        self.depleted
    }

    pub fn engaged(&self) -> bool {
        self.engaged
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// The breaker popped on overload and has not been re-closed.
    pub fn tripped(&self) -> bool {
        self.tripped
    }

    pub fn available(&self) -> bool {
        self.available
    }

    pub fn level(&self) -> Real {
        self.level
    }

    /// Upstream reference (or tie island supplier) that provided `level`.
    pub fn via(&self) -> Option<NodeId> {
        self.via
    }

    /// Powered only through a tie island.
    pub fn tie_fed(&self) -> bool {
        self.tie_fed
    }

    /// Supply path passes through a tie island somewhere upstream.
    pub fn through_tie(&self) -> bool {
        self.through_tie
    }

    /// Demand attributed through this node in the last step.
    pub fn load(&self) -> Real {
        self.load
    }

    /// Breaker/switch/source contact closed, with failures taken into account.
    pub(crate) fn conducting(&self) -> bool {
        !self.failed_open && (self.failed_closed || !self.commanded_open)
    }

    /// Tie engaged, with failures taken into account (a shorted tie is engaged).
    pub(crate) fn effectively_engaged(&self) -> bool {
        !self.failed_open && (self.failed_closed || self.engaged)
    }

    /// Converter running, with failures taken into account.
    pub(crate) fn effectively_active(&self) -> bool {
        !self.failed_open && (self.failed_closed || self.active)
    }

    pub(crate) fn clear_derived(&mut self) {
        self.available = false;
        self.level = 0.0;
        self.via = None;
        self.tie_fed = false;
        self.through_tie = false;
        self.load = 0.0;
    }

    pub(crate) fn set_failed_open(&mut self) {
        self.failed_open = true;
        self.failed_closed = false;
    }

    pub(crate) fn set_failed_closed(&mut self) {
        self.failed_closed = true;
        self.failed_open = false;
    }

    pub(crate) fn clear_failure(&mut self) {
        self.failed_open = false;
        self.failed_closed = false;
    }
}

/// State of every node, indexed by `NodeId`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTable {
    states: Vec<NodeState>,
}

impl StateTable {
    /// Initial state for every node of a topology.
    pub fn new(topology: &Topology) -> Self {
        Self {
            states: topology.nodes().iter().map(NodeState::initial).collect(),
        }
    }

    pub fn get(&self, id: NodeId) -> PnResult<&NodeState> {
        self.states
            .get(id.slot())
            .ok_or(PnError::UnknownId { id })
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> PnResult<&mut NodeState> {
        self.states
            .get_mut(id.slot())
            .ok_or(PnError::UnknownId { id })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeState)> {
        NodeId::range(self.states.len()).zip(self.states.iter())
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [NodeState] {
        &mut self.states
    }

    /// Same derived values for every node (levels compared bit-exactly).
    pub fn same_outputs(&self, other: &StateTable) -> bool {
        self.states.len() == other.states.len()
            && self.states.iter().zip(&other.states).all(|(a, b)| {
                a.available == b.available && a.level.to_bits() == b.level.to_bits()
            })
    }
}

/// Fail with `WrongKind` unless `node` satisfies `check`.
pub(crate) fn expect_kind(
    node: &ResourceNode,
    expected: &'static str,
    check: fn(&NodeKind) -> bool,
) -> PnResult<()> {
    if check(&node.kind) {
        Ok(())
    } else {
        Err(PnError::WrongKind {
            name: node.name.clone(),
            expected,
            actual: node.kind.label(),
        })
    }
}
