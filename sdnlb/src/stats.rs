//! Controller observability types.
//!
//! Obtain a snapshot via [`Controller::stats`](crate::Controller::stats).

pub use sdnlb_core::stats::{ControlPlaneStats, LinkStats, SwitchStats};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of a running [`Controller`](crate::Controller).
#[derive(Debug, Clone)]
pub struct ControllerStats {
    /// State of the control plane itself.
    pub plane: ControlPlaneStats,
    /// Events accepted by an [`EventSender`](crate::EventSender).
    pub events_delivered: u64,
    /// Events refused because a queue was full.
    pub events_rejected: u64,
    /// Statistics cycles started by the poller.
    pub poll_cycles: u64,
    /// Commands accepted by the south-bound transport.
    pub commands_sent: u64,
    /// Commands the south-bound transport failed to take.
    pub commands_failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    events_delivered: AtomicU64,
    events_rejected: AtomicU64,
    poll_cycles: AtomicU64,
    commands_sent: AtomicU64,
    commands_failed: AtomicU64,
}

impl Counters {
    pub(crate) fn event_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn event_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn poll_cycle(&self) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn command_sent(&self) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn command_failed(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, plane: ControlPlaneStats) -> ControllerStats {
        ControllerStats {
            plane,
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            poll_cycles: self.poll_cycles.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
        }
    }
}
