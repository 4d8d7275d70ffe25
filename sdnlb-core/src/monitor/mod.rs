//! Port statistics pipeline: outstanding requests, raw counters and the
//! per-port utilisation deltas derived from them.

mod counters;
mod delta;

pub use self::{
    counters::{CounterSnapshot, PortCounterStore},
    delta::{DeltaEngine, clamped_delta},
};
use crate::{
    port::{PortNo, PortStatsEntry},
    switch::SwitchId,
};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    time::Instant,
};
use tracing::debug;

/// Correlates a statistics reply with the request it answers.
///
/// Identifiers are never reused by a [`PortMonitor`], so a reply meant
/// for a connection that has since gone away cannot be taken for the
/// answer to a request sent after the switch reconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn into_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of feeding a statistics reply into the [`PortMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// the reply does not answer the request outstanding for the switch
    /// (it disconnected, the request was superseded, or the reply is
    /// unsolicited): nothing was recorded
    Discarded,
    /// first sample of the switch: counters recorded, no delta yet
    Baseline,
    /// deltas were recomputed for that many ports
    Deltas(usize),
}

/// Holds the [`PortCounterStore`] and [`DeltaEngine`] and correlates
/// statistics replies with the requests that were issued.
#[derive(Debug, Default)]
pub struct PortMonitor {
    counters: PortCounterStore,
    deltas: DeltaEngine,

    next_request: u64,
    /// switches with a statistics request in flight, and when it was issued
    pending: HashMap<SwitchId, (RequestId, Instant)>,
}

impl PortMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a statistics request has been issued to `switch`.
    ///
    /// A request still outstanding from a previous cycle is superseded.
    pub fn request(&mut self, switch: SwitchId, now: Instant) -> RequestId {
        let request = RequestId(self.next_request);
        self.next_request += 1;

        if let Some((previous, issued)) = self.pending.insert(switch, (request, now)) {
            debug!(
                switch = %switch,
                request = %previous,
                waited = ?now.saturating_duration_since(issued),
                "previous statistics request never answered"
            );
        }
        request
    }

    pub fn is_pending(&self, switch: SwitchId) -> bool {
        self.pending.contains_key(&switch)
    }

    /// Feed a statistics reply.
    ///
    /// The reply is only accepted if it answers the request outstanding
    /// for the switch; the counters of that switch are replaced with the
    /// new snapshot and the deltas recomputed against the previous one.
    pub fn ingest(
        &mut self,
        switch: SwitchId,
        request: RequestId,
        entries: impl IntoIterator<Item = PortStatsEntry>,
        now: Instant,
    ) -> Ingest {
        match self.pending.get(&switch) {
            Some((pending, _)) if *pending == request => {
                self.pending.remove(&switch);
            }
            pending => {
                debug!(
                    switch = %switch,
                    %request,
                    pending = ?pending.map(|(pending, _)| *pending),
                    "discarding uncorrelated statistics reply"
                );
                return Ingest::Discarded;
            }
        }

        let snapshot = CounterSnapshot::new(entries, now);
        let previous = self.counters.replace(switch, snapshot);
        let Some(current) = self.counters.get(switch) else {
            return Ingest::Discarded;
        };

        match self.deltas.update(switch, previous.as_ref(), current) {
            None => Ingest::Baseline,
            Some(deltas) => Ingest::Deltas(deltas.len()),
        }
    }

    pub fn delta(&self, switch: SwitchId, port: PortNo) -> Option<u64> {
        self.deltas.get(switch, port)
    }

    pub fn deltas(&self, switch: SwitchId) -> Option<&BTreeMap<PortNo, u64>> {
        self.deltas.switch(switch)
    }

    pub fn counters(&self) -> &PortCounterStore {
        &self.counters
    }

    /// Drop everything known about `switch`, cancelling any outstanding
    /// request so a late reply gets discarded.
    pub fn forget(&mut self, switch: SwitchId) {
        self.pending.remove(&switch);
        self.counters.remove(switch);
        self.deltas.remove(switch);
    }

    pub fn forget_port(&mut self, switch: SwitchId, port: PortNo) {
        self.counters.remove_port(switch, port);
        self.deltas.remove_port(switch, port);
    }
}
