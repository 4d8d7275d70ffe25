use crate::{
    port::{PortCounters, PortNo, PortStatsEntry},
    switch::SwitchId,
};
use std::{
    collections::{BTreeMap, HashMap},
    time::Instant,
};

/// The raw counters of every port of one switch, as of one statistics
/// reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    ports: BTreeMap<PortNo, PortCounters>,
    sampled_at: Instant,
}

impl CounterSnapshot {
    pub fn new(entries: impl IntoIterator<Item = PortStatsEntry>, sampled_at: Instant) -> Self {
        let ports = entries
            .into_iter()
            .map(|entry| (entry.port, entry.counters))
            .collect();
        Self { ports, sampled_at }
    }

    pub fn get(&self, port: PortNo) -> Option<&PortCounters> {
        self.ports.get(&port)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PortNo, &PortCounters)> {
        self.ports.iter().map(|(port, counters)| (*port, counters))
    }

    pub fn sampled_at(&self) -> Instant {
        self.sampled_at
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// Latest [`CounterSnapshot`] per switch.
#[derive(Debug, Default)]
pub struct PortCounterStore {
    snapshots: HashMap<SwitchId, CounterSnapshot>,
}

impl PortCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the switch's snapshot, returning the previous one.
    pub fn replace(
        &mut self,
        switch: SwitchId,
        snapshot: CounterSnapshot,
    ) -> Option<CounterSnapshot> {
        self.snapshots.insert(switch, snapshot)
    }

    pub fn get(&self, switch: SwitchId) -> Option<&CounterSnapshot> {
        self.snapshots.get(&switch)
    }

    pub fn remove(&mut self, switch: SwitchId) -> Option<CounterSnapshot> {
        self.snapshots.remove(&switch)
    }

    pub fn remove_port(&mut self, switch: SwitchId, port: PortNo) {
        if let Some(snapshot) = self.snapshots.get_mut(&switch) {
            snapshot.ports.remove(&port);
        }
    }

    pub fn contains(&self, switch: SwitchId) -> bool {
        self.snapshots.contains_key(&switch)
    }
}
