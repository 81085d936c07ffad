//! Built-in reference grids.

use crate::schema::TopologyDef;
use crate::{ProjectResult, parse_yaml};

/// YAML source of the lunar module power grid.
pub const LM_EPS_YAML: &str = include_str!("../grids/lm_eps.yaml");

/// The lunar module power grid, parsed and validated.
pub fn lm_eps() -> ProjectResult<TopologyDef> {
    parse_yaml(LM_EPS_YAML)
}
