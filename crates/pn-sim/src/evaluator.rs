//! Per-tick network evaluation.
//!
//! One evaluation:
//! 1. Walk every non-tie node in the order fixed by the topology. Sources,
//!    breakers, buses, converters and loads take the first available upstream
//!    reference; parallel feeds are never summed. A bus prefers an upstream
//!    whose path does not cross a tie island.
//! 2. Group buses joined by engaged ties into islands. A bus with no supply of
//!    its own takes the level of the first self-supplied bus of its island.
//!    Repeat the walk until the island feeds stop changing.
//! 3. Attribute each powered load's demand back along its supply path and pop
//!    any breaker whose rating is exceeded, then propagate again.
//!
//! Availability only grows between walks inside one propagation, so step 2
//! finishes within `bus count + 1` walks. Each breaker trips at most once per
//! evaluation, which bounds step 3 by the breaker count.

use pn_core::{NodeId, Real, Tolerances, nearly_equal};
use pn_graph::{NodeKind, Topology};
use tracing::warn;

use crate::state::NodeState;

/// Level and supplier a bus receives across its tie island.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IslandFeed {
    level: Real,
    supplier: NodeId,
}

/// What one evaluation did, beyond the state it wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Evaluation {
    /// Ordered walks performed, summed over trip rounds.
    pub passes: usize,
    /// Breakers popped on overload, in the order they tripped.
    pub trips: Vec<NodeId>,
}

/// Recompute every derived field of `states` from topology plus inputs.
pub(crate) fn evaluate(topology: &Topology, states: &mut [NodeState]) -> Evaluation {
    let mut eval = Evaluation::default();
    loop {
        eval.passes += propagate(topology, states);
        attribute_demand(topology, states);

        let overloaded = overloaded_breakers(topology, states);
        if overloaded.is_empty() {
            return eval;
        }
        for id in overloaded {
            let s = &mut states[id.slot()];
            s.commanded_open = true;
            s.tripped = true;
            eval.trips.push(id);
        }
    }
}

/// Run ordered walks until tie island feeds reach a fixed point.
fn propagate(topology: &Topology, states: &mut [NodeState]) -> usize {
    for s in states.iter_mut() {
        s.clear_derived();
    }

    let bus_count = topology.nodes().iter().filter(|n| n.kind.is_bus()).count();
    let limit = bus_count + 2;

    let mut feeds: Vec<Option<IslandFeed>> = vec![None; states.len()];
    let mut passes = 0;
    loop {
        passes += 1;
        walk(topology, states, &feeds);
        let next = island_feeds(topology, states);
        if next == feeds {
            return passes;
        }
        if passes >= limit {
            // Unreachable while availability is monotone between walks.
            warn!(passes, "tie islands did not settle; keeping last walk");
            return passes;
        }
        feeds = next;
    }
}

/// Derived supply of one node, as computed by a walk.
#[derive(Debug, Clone, Copy, Default)]
struct Derived {
    available: bool,
    level: Real,
    via: Option<NodeId>,
    tie_fed: bool,
    through_tie: bool,
}

impl Derived {
    fn from_upstream(upstream: NodeId, s: &NodeState) -> Self {
        Self {
            available: true,
            level: s.level,
            via: Some(upstream),
            tie_fed: false,
            through_tie: s.through_tie,
        }
    }
}

/// One ordered walk over every non-tie node.
fn walk(topology: &Topology, states: &mut [NodeState], feeds: &[Option<IslandFeed>]) {
    for &id in topology.eval_order() {
        let node = &topology.nodes()[id.slot()];
        let state = states[id.slot()];

        let derived = match node.kind {
            NodeKind::Source { nominal_level } => {
                if !state.depleted && state.conducting() {
                    Derived {
                        available: true,
                        level: nominal_level,
                        ..Derived::default()
                    }
                } else {
                    Derived::default()
                }
            }
            NodeKind::Breaker { .. } => {
                if state.conducting() {
                    first_available(&node.upstream, states)
                } else {
                    Derived::default()
                }
            }
            NodeKind::Bus => {
                if state.failed_open {
                    Derived::default()
                } else {
                    bus_supply(&node.upstream, states, feeds[id.slot()])
                }
            }
            NodeKind::Converter => {
                if state.effectively_active() {
                    first_available(&node.upstream, states)
                } else {
                    Derived::default()
                }
            }
            NodeKind::Load { .. } => {
                if state.failed_open {
                    Derived::default()
                } else {
                    first_available(&node.upstream, states)
                }
            }
            NodeKind::Tie { .. } => continue,
        };

        let s = &mut states[id.slot()];
        s.available = derived.available;
        s.level = derived.level;
        s.via = derived.via;
        s.tie_fed = derived.tie_fed;
        s.through_tie = derived.through_tie;
    }
}

/// First available upstream in declaration order.
fn first_available(upstream: &[NodeId], states: &[NodeState]) -> Derived {
    upstream
        .iter()
        .find(|u| states[u.slot()].available)
        .map_or_else(Derived::default, |&u| {
            Derived::from_upstream(u, &states[u.slot()])
        })
}

/// Supply of a bus: a direct feed that avoids every tie island wins, then any
/// other available upstream, then the bus's island feed.
///
/// A bus that has supply of its own never switches to a path that runs
/// through a tie, which may be its own island coming back around.
fn bus_supply(upstream: &[NodeId], states: &[NodeState], feed: Option<IslandFeed>) -> Derived {
    let direct = upstream.iter().find(|u| {
        let s = &states[u.slot()];
        s.available && !s.through_tie
    });
    if let Some(&u) = direct {
        return Derived::from_upstream(u, &states[u.slot()]);
    }
    let own = first_available(upstream, states);
    match feed {
        Some(feed) if !own.available => Derived {
            available: true,
            level: feed.level,
            via: Some(feed.supplier),
            tie_fed: true,
            through_tie: true,
        },
        _ => own,
    }
}

/// Compute island feeds from the buses' own supply and update tie node state.
fn island_feeds(topology: &Topology, states: &mut [NodeState]) -> Vec<Option<IslandFeed>> {
    let n = states.len();
    let mut parent: Vec<usize> = (0..n).collect();
    let mut tied = vec![false; n];

    for &tie in topology.ties() {
        if let NodeKind::Tie { sides: [a, b] } = topology.nodes()[tie.slot()].kind {
            if states[tie.slot()].effectively_engaged() {
                union(&mut parent, a.slot(), b.slot());
                tied[a.slot()] = true;
                tied[b.slot()] = true;
            }
        }
    }

    // First self-supplied bus of each island, in declaration order. A bus
    // fed directly beats one whose own path already crosses a tie.
    let mut supplier: Vec<Option<NodeId>> = vec![None; n];
    for node in topology.nodes() {
        let s = &states[node.id.slot()];
        if tied[node.id.slot()] && s.available && !s.tie_fed {
            let root = find(&mut parent, node.id.slot());
            let better = match supplier[root] {
                None => true,
                Some(current) => states[current.slot()].through_tie && !s.through_tie,
            };
            if better {
                supplier[root] = Some(node.id);
            }
        }
    }

    let mut feeds = vec![None; n];
    for node in topology.nodes() {
        let slot = node.id.slot();
        if !tied[slot] {
            continue;
        }
        let s = &states[slot];
        if s.available && !s.tie_fed {
            continue;
        }
        let root = find(&mut parent, slot);
        if let Some(sup) = supplier[root] {
            feeds[slot] = Some(IslandFeed {
                level: states[sup.slot()].level,
                supplier: sup,
            });
        }
    }

    for &tie in topology.ties() {
        let NodeKind::Tie { sides: [a, _] } = topology.nodes()[tie.slot()].kind else {
            continue;
        };
        let engaged = states[tie.slot()].effectively_engaged();
        let root = find(&mut parent, a.slot());
        let island_supplier = if engaged { supplier[root] } else { None };
        let level = island_supplier.map_or(0.0, |sup| states[sup.slot()].level);
        let t = &mut states[tie.slot()];
        t.available = island_supplier.is_some();
        t.level = level;
        t.via = island_supplier;
        t.tie_fed = false;
    }

    feeds
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // Lower index stays root so islands are keyed deterministically.
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[hi] = lo;
    }
}

/// Walk each powered load's supply path, adding its demand to every node on it.
///
/// Each node on a path is charged once, even if the `via` chain loops back.
fn attribute_demand(topology: &Topology, states: &mut [NodeState]) {
    let mut seen = vec![usize::MAX; states.len()];
    for (pass, &load) in topology.loads().iter().enumerate() {
        let demand = topology.nodes()[load.slot()].demand();
        if !states[load.slot()].available || demand == 0.0 {
            continue;
        }
        seen[load.slot()] = pass;
        states[load.slot()].load += demand;
        let mut current = states[load.slot()].via;
        while let Some(id) = current {
            if std::mem::replace(&mut seen[id.slot()], pass) == pass {
                warn!(
                    load = topology.name_of(load),
                    at = topology.name_of(id),
                    "supply path loops back on itself"
                );
                break;
            }
            states[id.slot()].load += demand;
            current = states[id.slot()].via;
        }
    }
}

fn overloaded_breakers(topology: &Topology, states: &[NodeState]) -> Vec<NodeId> {
    topology
        .eval_order()
        .iter()
        .copied()
        .filter(|id| {
            let node = &topology.nodes()[id.slot()];
            let s = &states[id.slot()];
            match node.capacity() {
                // A welded contact cannot pop. Demand summed to exactly the
                // rating holds.
                Some(capacity) => {
                    s.available
                        && !s.failed_closed
                        && !s.tripped
                        && s.load > capacity
                        && !nearly_equal(s.load, capacity, Tolerances::default())
                }
                None => false,
            }
        })
        .collect()
}
