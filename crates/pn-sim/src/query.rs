//! Load query interface.
//!
//! Consumers (pumps, heaters, computers, instruments) ask "am I powered, at
//! what level" through [`NetworkView`] without knowing the wiring.

use std::sync::Arc;

use pn_core::{NodeId, PnError, PnResult, Real};
use pn_graph::Topology;

use crate::state::expect_kind;

/// Supply seen by a node after the most recent step.
///
/// Treat `available == false` as "no power" whatever `level` says, and do not
/// keep a `Supply` across ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Supply {
    pub available: bool,
    pub level: Real,
}

impl Supply {
    pub const UNPOWERED: Supply = Supply {
        available: false,
        level: 0.0,
    };

    /// `level` when available, else zero.
    pub fn effective_level(&self) -> Real {
        if self.available { self.level } else { 0.0 }
    }
}

/// Read-only access to the result of the most recent step.
pub trait NetworkView {
    /// Wiring the view answers for.
    fn topology(&self) -> &Topology;

    /// Supply of any node (e.g. a bus voltmeter reading).
    fn query_node(&self, node: NodeId) -> PnResult<Supply>;

    /// Supply of a load. Fails with a lookup error for unknown ids or non-loads.
    fn query(&self, load: NodeId) -> PnResult<Supply> {
        let node = self.topology().try_node(load)?;
        expect_kind(node, "load", |k| k.is_load())?;
        self.query_node(load)
    }

    /// Supply of a load addressed by name.
    fn query_named(&self, name: &str) -> PnResult<Supply> {
        let id = self.topology().id_of(name)?;
        self.query(id)
    }
}

/// Immutable copy of every node's supply for one tick.
///
/// Cheap to clone and `Send + Sync`, so a rendering thread can hold one while
/// the driver thread steps the network.
#[derive(Debug, Clone)]
pub struct SupplyTable {
    topology: Arc<Topology>,
    tick: u64,
    supplies: Arc<[Supply]>,
}

impl SupplyTable {
    pub(crate) fn new(topology: Arc<Topology>, tick: u64, supplies: Vec<Supply>) -> Self {
        Self {
            topology,
            tick,
            supplies: supplies.into(),
        }
    }

    /// Tick the table was taken at.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Supply)> + '_ {
        NodeId::range(self.supplies.len()).zip(self.supplies.iter().copied())
    }
}

impl NetworkView for SupplyTable {
    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn query_node(&self, node: NodeId) -> PnResult<Supply> {
        self.supplies
            .get(node.slot())
            .copied()
            .ok_or(PnError::UnknownId { id: node })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pn_graph::TopologyBuilder;

    fn table() -> (SupplyTable, NodeId, NodeId) {
        let mut b = TopologyBuilder::new();
        let bat = b.add_source("BAT", 28.0);
        let load = b.add_load("LOAD", &[bat]);
        let topo = Arc::new(b.build().unwrap());
        let supplies = vec![
            Supply {
                available: true,
                level: 28.0,
            },
            Supply {
                available: true,
                level: 28.0,
            },
        ];
        (SupplyTable::new(topo, 3, supplies), bat, load)
    }

    #[test]
    fn effective_level_ignores_stale_level() {
        let stale = Supply {
            available: false,
            level: 28.0,
        };
        assert_eq!(stale.effective_level(), 0.0);
        assert_eq!(Supply::UNPOWERED.effective_level(), 0.0);
    }

    #[test]
    fn query_requires_a_load() {
        let (table, bat, load) = table();
        assert_eq!(table.query(load).unwrap().level, 28.0);
        assert!(matches!(
            table.query(bat).unwrap_err(),
            PnError::WrongKind { .. }
        ));
        assert!(table.query_node(bat).unwrap().available);
        assert!(table.query_named("NOPE").unwrap_err().is_lookup());
        assert_eq!(table.tick(), 3);
    }

    #[test]
    fn table_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SupplyTable>();
    }
}
