//! pn-core: stable foundation for powernet.
//!
//! Contains:
//! - ids (stable compact IDs for topology nodes)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PnError, PnResult};
pub use ids::*;
pub use numeric::*;
