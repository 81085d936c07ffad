//! Operator commands.
//!
//! Panel code never touches network internals: it sends a [`Command`], either
//! directly through `Network::apply` or from another thread through a
//! [`CommandSender`]. Commands only write state; nothing is recomputed until
//! the next step, so a burst of commands within one tick costs one evaluation.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use pn_core::{NodeId, PnError, PnResult, SelectorId};

/// A panel action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Throw a breaker, switch or battery contactor.
    SetCommandedOpen { node: NodeId, open: bool },
    /// Engage or release a cross-tie.
    SetEngaged { tie: NodeId, engaged: bool },
    /// Start or stop a converter.
    SetActive { converter: NodeId, active: bool },
    /// Move a selector switch to one of its positions.
    Select {
        selector: SelectorId,
        position: usize,
    },
}

/// Cloneable handle for posting commands from input-handling threads.
///
/// Posted commands are buffered and applied at the start of the next step.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    pub fn send(&self, command: Command) -> PnResult<()> {
        self.tx.send(command).map_err(|_| PnError::InvalidArg {
            what: "network no longer accepts commands",
        })
    }
}

/// Receiving end owned by the network.
#[derive(Debug)]
pub(crate) struct CommandQueue {
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl CommandQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Everything posted so far, in arrival order.
    pub(crate) fn drain(&self) -> Vec<Command> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(command) => out.push(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return out,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_preserves_order_across_threads() {
        let queue = CommandQueue::new();
        let sender = queue.sender();
        let node = NodeId::from_index(1);

        let handle = std::thread::spawn(move || {
            sender
                .send(Command::SetCommandedOpen { node, open: true })
                .unwrap();
            sender
                .send(Command::SetCommandedOpen { node, open: false })
                .unwrap();
        });
        handle.join().unwrap();

        let drained = queue.drain();
        assert_eq!(
            drained,
            vec![
                Command::SetCommandedOpen { node, open: true },
                Command::SetCommandedOpen { node, open: false },
            ]
        );
        assert!(queue.drain().is_empty());
    }
}
