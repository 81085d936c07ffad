//! The per-spacecraft network instance.

use std::sync::Arc;

use pn_core::{NodeId, PnError, PnResult, SelectorId};
use pn_graph::{NodeKind, Topology};
use tracing::{debug, info, warn};

use crate::command::{Command, CommandQueue, CommandSender};
use crate::evaluator;
use crate::faults::FaultSchedule;
use crate::query::{NetworkView, Supply, SupplyTable};
use crate::state::{NodeState, StateTable, expect_kind};

/// Summary of one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Tick number of this step (the first step is tick 1).
    pub tick: u64,
    /// Buffered commands applied at the start of the step.
    pub commands_applied: usize,
    /// Buffered commands rejected (unknown node, wrong kind).
    pub commands_rejected: usize,
    /// Scheduled faults that fired at the start of the step.
    pub faults_fired: usize,
    /// Ordered walks needed to settle tie islands.
    pub passes: usize,
    /// Breakers popped on overload during this step.
    pub trips: Vec<NodeId>,
    /// Nodes available after the step.
    pub available: usize,
}

/// One spacecraft's resource network: immutable wiring plus mutable state.
///
/// All mutation happens on the thread that owns the `Network` (the tick
/// driver). Other threads post commands through a [`CommandSender`] and read
/// results through a [`SupplyTable`].
#[derive(Debug)]
pub struct Network {
    topology: Arc<Topology>,
    states: StateTable,
    commands: CommandQueue,
    schedule: FaultSchedule,
    tick: u64,
    evaluated: bool,
}

impl Network {
    /// New network with every node in its declared initial state.
    ///
    /// Nothing is evaluated until the first `step()`.
    pub fn new(topology: Arc<Topology>) -> Self {
        let states = StateTable::new(&topology);
        Self {
            topology,
            states,
            commands: CommandQueue::new(),
            schedule: FaultSchedule::new(),
            tick: 0,
            evaluated: false,
        }
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// Number of steps taken (or the tick restored from a snapshot).
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// True once derived state reflects current inputs' last evaluation.
    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub fn states(&self) -> &StateTable {
        &self.states
    }

    pub fn state(&self, node: NodeId) -> PnResult<&NodeState> {
        self.states.get(node)
    }

    pub(crate) fn states_mut(&mut self) -> &mut StateTable {
        &mut self.states
    }

    pub(crate) fn schedule_mut(&mut self) -> &mut FaultSchedule {
        &mut self.schedule
    }

    pub fn schedule(&self) -> &FaultSchedule {
        &self.schedule
    }

    /// Resolve a node name.
    pub fn resolve(&self, name: &str) -> PnResult<NodeId> {
        self.topology.id_of(name)
    }

    /// Handle for posting commands from other threads.
    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    /// Advance one tick: apply buffered commands, fire due faults, evaluate.
    pub fn step(&mut self) -> StepReport {
        self.tick += 1;
        let tick = self.tick;

        let mut applied = 0;
        let mut rejected = 0;
        for command in self.commands.drain() {
            match self.apply(command) {
                Ok(()) => applied += 1,
                Err(err) => {
                    warn!(tick, ?command, %err, "command rejected");
                    rejected += 1;
                }
            }
        }

        let faults_fired = self.fire_due_faults(tick);
        let eval = self.evaluate();

        for &trip in &eval.trips {
            info!(
                tick,
                breaker = self.topology.name_of(trip),
                "breaker tripped on overload"
            );
        }

        let available = self.states.iter().filter(|(_, s)| s.available()).count();
        debug!(
            tick,
            passes = eval.passes,
            available,
            trips = eval.trips.len(),
            "network step"
        );

        StepReport {
            tick,
            commands_applied: applied,
            commands_rejected: rejected,
            faults_fired,
            passes: eval.passes,
            trips: eval.trips,
            available,
        }
    }

    /// Recompute derived state without advancing the tick or consuming input.
    pub(crate) fn evaluate(&mut self) -> evaluator::Evaluation {
        let eval = evaluator::evaluate(&self.topology, self.states.as_mut_slice());
        self.evaluated = true;
        eval
    }

    /// Apply a command to state now. Nothing is recomputed until the next step.
    pub fn apply(&mut self, command: Command) -> PnResult<()> {
        match command {
            Command::SetCommandedOpen { node, open } => self.set_commanded_open(node, open),
            Command::SetEngaged { tie, engaged } => self.set_engaged(tie, engaged),
            Command::SetActive { converter, active } => self.set_active(converter, active),
            Command::Select { selector, position } => self.select(selector, position),
        }
    }

    /// Throw a breaker, switch or source contactor. Closing a popped breaker
    /// resets it.
    pub fn set_commanded_open(&mut self, node: NodeId, open: bool) -> PnResult<()> {
        let n = self.topology.try_node(node)?;
        expect_kind(n, "breaker or source", |k| k.is_breaker() || k.is_source())?;
        let s = self.states.get_mut(node)?;
        s.commanded_open = open;
        if !open {
            s.tripped = false;
        }
        Ok(())
    }

    pub fn set_engaged(&mut self, tie: NodeId, engaged: bool) -> PnResult<()> {
        let n = self.topology.try_node(tie)?;
        expect_kind(n, "tie", NodeKind::is_tie)?;
        self.states.get_mut(tie)?.engaged = engaged;
        Ok(())
    }

    pub fn set_active(&mut self, converter: NodeId, active: bool) -> PnResult<()> {
        let n = self.topology.try_node(converter)?;
        expect_kind(n, "converter", NodeKind::is_converter)?;
        self.states.get_mut(converter)?.active = active;
        Ok(())
    }

    /// Move a selector to `position`: its members in that position are
    /// activated/closed, every other member is deactivated/opened.
    pub fn select(&mut self, selector: SelectorId, position: usize) -> PnResult<()> {
        let topology = Arc::clone(&self.topology);
        let sel = topology
            .selector(selector)
            .ok_or(PnError::UnknownId { id: selector })?;
        let chosen = sel.positions.get(position).ok_or(PnError::InvalidArg {
            what: "selector position out of range",
        })?;

        for member in sel.members() {
            let on = chosen.members.contains(&member);
            match topology.try_node(member)?.kind {
                NodeKind::Converter => self.set_active(member, on)?,
                NodeKind::Breaker { .. } => self.set_commanded_open(member, !on)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// `select` by selector and position names.
    pub fn select_named(&mut self, selector: &str, position: &str) -> PnResult<()> {
        let id = self.topology.selector_id(selector)?;
        let index = self
            .topology
            .selector(id)
            .and_then(|s| s.position_index(position))
            .ok_or_else(|| PnError::lookup(format!("{selector}/{position}")))?;
        self.select(id, index)
    }

    /// Copy of every node's supply, for readers on other threads.
    pub fn supplies(&self) -> PnResult<SupplyTable> {
        if !self.evaluated {
            return Err(PnError::NotEvaluated);
        }
        let supplies = self
            .states
            .iter()
            .map(|(_, s)| supply_of(s))
            .collect();
        Ok(SupplyTable::new(Arc::clone(&self.topology), self.tick, supplies))
    }

    /// Drop derived state and put every node back in its declared initial state.
    pub(crate) fn reset_states(&mut self, states: StateTable, tick: u64) {
        self.states = states;
        self.tick = tick;
        self.evaluated = false;
    }

    /// Discard commands posted but not yet applied.
    pub(crate) fn discard_pending_commands(&mut self) -> usize {
        self.commands.drain().len()
    }
}

fn supply_of(s: &NodeState) -> Supply {
    Supply {
        available: s.available(),
        level: s.level(),
    }
}

impl NetworkView for Network {
    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn query_node(&self, node: NodeId) -> PnResult<Supply> {
        if !self.evaluated {
            return Err(PnError::NotEvaluated);
        }
        self.states.get(node).map(supply_of)
    }
}
