//! Fixed-tick runner and result recording.

use pn_core::{NodeId, PnError, PnResult};

use crate::network::Network;
use crate::query::SupplyTable;

/// Options for a batch of steps.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Number of steps to take.
    pub ticks: u64,
    /// Record every N-th step (decimation)
    pub record_every: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 100,
            record_every: 10,
        }
    }
}

/// Record of a run.
#[derive(Clone, Debug, Default)]
pub struct RunRecord {
    /// Supplies at each recorded tick, oldest first.
    pub samples: Vec<SupplyTable>,
    /// Every breaker that tripped, with the tick it tripped on.
    pub trips: Vec<(u64, NodeId)>,
    /// Commands rejected over the whole run.
    pub commands_rejected: usize,
}

impl RunRecord {
    pub fn ticks(&self) -> Vec<u64> {
        self.samples.iter().map(SupplyTable::tick).collect()
    }

    pub fn last(&self) -> Option<&SupplyTable> {
        self.samples.last()
    }
}

/// Step `network` `opts.ticks` times, recording decimated supply tables.
///
/// The final step is always recorded.
pub fn run(network: &mut Network, opts: &RunOptions) -> PnResult<RunRecord> {
    if opts.ticks == 0 {
        return Err(PnError::InvalidArg {
            what: "ticks must be positive",
        });
    }
    if opts.record_every == 0 {
        return Err(PnError::InvalidArg {
            what: "record_every must be positive",
        });
    }

    let mut record = RunRecord::default();
    for step in 1..=opts.ticks {
        let report = network.step();
        record
            .trips
            .extend(report.trips.iter().map(|&id| (report.tick, id)));
        record.commands_rejected += report.commands_rejected;

        if step % opts.record_every == 0 || step == opts.ticks {
            record.samples.push(network.supplies()?);
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faults::FaultAction;
    use crate::query::NetworkView;
    use pn_graph::TopologyBuilder;
    use std::sync::Arc;

    fn network() -> (Network, NodeId, NodeId) {
        let mut b = TopologyBuilder::new();
        let bat = b.add_source("BAT", 28.0);
        let bus = b.add_bus("BUS", &[bat]);
        let load = b.add_load("LOAD", &[bus]);
        (Network::new(Arc::new(b.build().unwrap())), bat, load)
    }

    #[test]
    fn run_options_defaults() {
        let opts = RunOptions::default();
        assert_eq!(opts.ticks, 100);
        assert_eq!(opts.record_every, 10);
    }

    #[test]
    fn run_options_invalid() {
        let (mut net, _, _) = network();
        let opts = RunOptions {
            ticks: 0,
            record_every: 1,
        };
        assert!(run(&mut net, &opts).is_err());
        let opts = RunOptions {
            ticks: 5,
            record_every: 0,
        };
        assert!(run(&mut net, &opts).is_err());
    }

    #[test]
    fn records_decimated_and_final() {
        let (mut net, bat, load) = network();
        net.schedule_fault(6, bat, FaultAction::Deplete).unwrap();

        let record = run(
            &mut net,
            &RunOptions {
                ticks: 7,
                record_every: 3,
            },
        )
        .unwrap();

        assert_eq!(record.ticks(), vec![3, 6, 7]);
        assert!(record.samples[0].query(load).unwrap().available);
        assert!(!record.samples[1].query(load).unwrap().available);
        assert!(record.trips.is_empty());
        assert_eq!(record.last().unwrap().tick(), 7);
    }
}
