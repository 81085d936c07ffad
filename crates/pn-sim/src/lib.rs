//! Per-tick evaluation of a spacecraft resource distribution network.
//!
//! Provides:
//! - Per-node state store (commanded position, failures, derived supply)
//! - Network evaluator with tie islands and overload trips
//! - Fault injector with scheduled faults
//! - Command interface with buffered cross-thread input
//! - Load query interface and shareable supply tables
//! - State snapshots for save/restore
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pn_graph::TopologyBuilder;
//! use pn_sim::{Network, NetworkView};
//!
//! let mut builder = TopologyBuilder::new();
//! let bat = builder.add_source("BAT", 28.0);
//! let cb = builder.add_breaker("CB", &[bat]);
//! let bus = builder.add_bus("BUS", &[cb]);
//! let load = builder.add_load("LOAD", &[bus]);
//!
//! let mut net = Network::new(Arc::new(builder.build().unwrap()));
//! net.step();
//! assert_eq!(net.query(load).unwrap().level, 28.0);
//!
//! net.set_commanded_open(cb, true).unwrap();
//! net.step();
//! assert!(!net.query(load).unwrap().available);
//! ```

pub mod command;
pub mod faults;
pub mod network;
pub mod query;
pub mod sim;
pub mod snapshot;
pub mod state;

// Internal modules
mod evaluator;

// Re-exports for public API
pub use command::{Command, CommandSender};
pub use faults::{FaultAction, FaultSchedule, ScheduledFault};
pub use network::{Network, StepReport};
pub use pn_core::{NodeId, PnError, PnResult, SelectorId};
pub use query::{NetworkView, Supply, SupplyTable};
pub use sim::{RunOptions, RunRecord, run};
pub use snapshot::{SavedNode, StateSnapshot};
pub use state::{NodeState, StateTable};
