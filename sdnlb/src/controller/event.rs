use crate::stats::Counters;
use sdnlb_core::Event;
use std::sync::{
    Arc,
    mpsc::{Receiver, SyncSender, TrySendError, sync_channel},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliverError {
    /// This error should only happen if the controller is overloaded
    /// with backlog events.
    #[error("Failed to deliver {}: queue is full.", .0.kind())]
    Full(Event),
    #[error("Failed to deliver {}: controller stopped.", .0.kind())]
    Disconnected(Event),
}

impl DeliverError {
    /// give back the event that could not be delivered
    pub fn into_event(self) -> Event {
        match self {
            Self::Full(event) | Self::Disconnected(event) => event,
        }
    }
}

/// Hands south-bound events to a running [`Controller`].
///
/// Statistics replies go to the poller, everything else to the packet
/// dispatcher, each through its own bounded queue. Sending never blocks.
///
/// [`Controller`]: crate::Controller
#[derive(Clone)]
pub struct EventSender {
    dispatch: SyncSender<Event>,
    stats: SyncSender<Event>,
    counters: Arc<Counters>,
}

pub(crate) struct EventReceivers {
    pub(crate) dispatch: Receiver<Event>,
    pub(crate) stats: Receiver<Event>,
}

pub(crate) fn event_channel(
    capacity: usize,
    counters: Arc<Counters>,
) -> (EventSender, EventReceivers) {
    let (dispatch, dispatch_receiver) = sync_channel(capacity);
    let (stats, stats_receiver) = sync_channel(capacity);

    (
        EventSender {
            dispatch,
            stats,
            counters,
        },
        EventReceivers {
            dispatch: dispatch_receiver,
            stats: stats_receiver,
        },
    )
}

impl EventSender {
    pub fn send(&self, event: Event) -> Result<(), DeliverError> {
        let queue = match event {
            Event::PortStatsReply { .. } => &self.stats,
            _ => &self.dispatch,
        };

        match queue.try_send(event) {
            Ok(()) => {
                self.counters.event_delivered();
                Ok(())
            }
            Err(TrySendError::Full(event)) => {
                self.counters.event_rejected();
                Err(DeliverError::Full(event))
            }
            Err(TrySendError::Disconnected(event)) => Err(DeliverError::Disconnected(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdnlb_core::{PortStatsEntry, RequestId, SwitchId};

    #[test]
    fn statistics_replies_are_routed_to_the_poller() {
        let (sender, receivers) = event_channel(4, Arc::default());
        let switch = SwitchId::new(1);

        sender.send(Event::SwitchConnected { switch }).unwrap();
        sender
            .send(Event::PortStatsReply {
                switch,
                request: RequestId::new(0),
                entries: vec![PortStatsEntry::bytes(1, 1, 1)],
            })
            .unwrap();

        assert!(matches!(
            receivers.dispatch.try_recv(),
            Ok(Event::SwitchConnected { .. })
        ));
        assert!(receivers.dispatch.try_recv().is_err());
        assert!(matches!(
            receivers.stats.try_recv(),
            Ok(Event::PortStatsReply { .. })
        ));
    }

    #[test]
    fn full_queue_gives_the_event_back() {
        let counters = Arc::new(Counters::default());
        let (sender, _receivers) = event_channel(1, Arc::clone(&counters));
        let switch = SwitchId::new(1);

        sender.send(Event::SwitchConnected { switch }).unwrap();
        let error = sender
            .send(Event::SwitchDisconnected { switch })
            .unwrap_err();

        assert!(matches!(error, DeliverError::Full(_)));
        assert_eq!(error.into_event(), Event::SwitchDisconnected { switch });

        let stats = counters.snapshot(sdnlb_core::stats::ControlPlaneStats {
            switches: Vec::new(),
            links: Vec::new(),
            hosts: 0,
            generation: 0,
        });
        assert_eq!(stats.events_delivered, 1);
        assert_eq!(stats.events_rejected, 1);
    }

    #[test]
    fn stopped_controller() {
        let (sender, receivers) = event_channel(1, Arc::default());
        drop(receivers);

        assert!(matches!(
            sender.send(Event::SwitchConnected {
                switch: SwitchId::new(1)
            }),
            Err(DeliverError::Disconnected(_))
        ));
    }
}
