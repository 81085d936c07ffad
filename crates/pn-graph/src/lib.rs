//! pn-graph: topology layer for powernet.
//!
//! Provides:
//! - Resource node model (Source, Breaker, Bus, Tie, Converter, Load)
//! - Incremental topology builder with validation
//! - Evaluation order fixed at construction
//!
//! # Example
//!
//! ```
//! use pn_graph::TopologyBuilder;
//!
//! let mut builder = TopologyBuilder::new();
//! let bat = builder.add_source("BAT_1", 28.0);
//! let cb = builder.add_breaker("BAT_1_CB", &[bat]);
//! let bus = builder.add_bus("CDR_BUS", &[cb]);
//! builder.add_load("FLOOD_LTG", &[bus]);
//! let topology = builder.build().unwrap();
//!
//! assert_eq!(topology.len(), 4);
//! assert_eq!(topology.eval_order()[0], bat);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub(crate) mod indexing;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::TopologyBuilder;
pub use error::TopologyError;
pub use graph::{
    InitialState, NodeKind, ResourceNode, Selector, SelectorPosition, Topology,
};
