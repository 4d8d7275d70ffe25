use sdnlb_core::{Command, SwitchId};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use thiserror::Error;

/// The transport toward the switches.
///
/// Implementations encode the [`Command`] for the wire and hand it to the
/// connection of [`Command::switch`]. They must not block: the dispatcher
/// calls `send` inline while handling events.
pub trait Southbound: Send + Sync + 'static {
    fn send(&self, command: Command) -> Result<(), SouthboundError>;
}

#[derive(Debug, Error)]
pub enum SouthboundError {
    #[error("Switch ({switch}) is not connected")]
    NotConnected { switch: SwitchId },
    /// This error should only happen if the connection is overloaded
    /// with backlog commands. It does not count toward the failures
    /// that get a switch disconnected.
    #[error("Failed to send command to switch ({switch}): queue is full.")]
    Full { switch: SwitchId },
    #[error("Failed to send command to switch ({switch}): transport closed.")]
    Closed { switch: SwitchId },
}

impl SouthboundError {
    pub fn switch(&self) -> SwitchId {
        match self {
            Self::NotConnected { switch } | Self::Full { switch } | Self::Closed { switch } => {
                *switch
            }
        }
    }
}

/// A [`Southbound`] handing commands over a bounded channel, for a
/// transport running on its own thread (and for tests).
#[derive(Debug, Clone)]
pub struct ChannelSouthbound(SyncSender<Command>);

pub fn channel_southbound(capacity: usize) -> (ChannelSouthbound, Receiver<Command>) {
    let (sender, receiver) = sync_channel(capacity);
    (ChannelSouthbound(sender), receiver)
}

impl Southbound for ChannelSouthbound {
    fn send(&self, command: Command) -> Result<(), SouthboundError> {
        let switch = command.switch();
        self.0.try_send(command).map_err(|error| match error {
            TrySendError::Full(_) => SouthboundError::Full { switch },
            TrySendError::Disconnected(_) => SouthboundError::Closed { switch },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdnlb_core::RequestId;

    #[test]
    fn channel_errors() {
        let switch = SwitchId::new(7);
        let request = RequestId::new(1);
        let (southbound, receiver) = channel_southbound(1);

        southbound
            .send(Command::RequestPortStats { switch, request })
            .unwrap();
        assert!(matches!(
            southbound.send(Command::RequestPortStats { switch, request }),
            Err(SouthboundError::Full { .. })
        ));
        assert_eq!(
            receiver.recv().unwrap(),
            Command::RequestPortStats { switch, request }
        );

        drop(receiver);
        let error = southbound
            .send(Command::Disconnect { switch })
            .unwrap_err();
        assert!(matches!(error, SouthboundError::Closed { .. }));
        assert_eq!(error.switch(), switch);
    }
}
