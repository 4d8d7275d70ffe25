use super::counters::CounterSnapshot;
use crate::{port::PortNo, switch::SwitchId};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Per-port utilisation deltas (rx + tx bytes between two consecutive
/// samples) of every switch.
///
/// A port has no delta until two samples exist for it. Deltas are kept
/// until the next sample of the same switch overwrites them.
#[derive(Debug, Default)]
pub struct DeltaEngine {
    deltas: HashMap<SwitchId, BTreeMap<PortNo, u64>>,
}

/// `new - old`, clamped to `0` when the counter went backward (reset or
/// wrap-around on the switch).
pub fn clamped_delta(old: u64, new: u64) -> u64 {
    new.saturating_sub(old)
}

impl DeltaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the deltas between `previous` and `current` for `switch`.
    ///
    /// Without a previous snapshot the current one is only a baseline and
    /// `None` is returned. Otherwise the switch's deltas are replaced by the
    /// freshly computed ones and returned.
    pub fn update(
        &mut self,
        switch: SwitchId,
        previous: Option<&CounterSnapshot>,
        current: &CounterSnapshot,
    ) -> Option<&BTreeMap<PortNo, u64>> {
        let previous = previous?;

        let mut deltas = BTreeMap::new();
        for (port, counters) in current.iter() {
            let Some(old) = previous.get(port) else {
                // new port: this sample is its baseline
                continue;
            };
            let (old, new) = (old.total_bytes(), counters.total_bytes());
            if new < old {
                warn!(
                    switch = %switch,
                    port = %port,
                    old,
                    new,
                    "port counters went backward, clamping delta to 0"
                );
            }
            deltas.insert(port, clamped_delta(old, new));
        }

        self.deltas.insert(switch, deltas);
        self.deltas.get(&switch)
    }

    pub fn get(&self, switch: SwitchId, port: PortNo) -> Option<u64> {
        self.deltas.get(&switch)?.get(&port).copied()
    }

    pub fn switch(&self, switch: SwitchId) -> Option<&BTreeMap<PortNo, u64>> {
        self.deltas.get(&switch)
    }

    pub fn remove(&mut self, switch: SwitchId) {
        self.deltas.remove(&switch);
    }

    pub fn remove_port(&mut self, switch: SwitchId, port: PortNo) {
        if let Some(deltas) = self.deltas.get_mut(&switch) {
            deltas.remove(&port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortStatsEntry;
    use std::time::Instant;

    const S1: SwitchId = SwitchId::new(1);
    const P1: PortNo = PortNo::new(1);
    const P2: PortNo = PortNo::new(2);

    fn snapshot(entries: &[(u32, u64, u64)]) -> CounterSnapshot {
        CounterSnapshot::new(
            entries
                .iter()
                .map(|&(port, rx, tx)| PortStatsEntry::bytes(port, rx, tx)),
            Instant::now(),
        )
    }

    #[test]
    fn first_sample_is_baseline() {
        let mut engine = DeltaEngine::new();

        assert!(engine.update(S1, None, &snapshot(&[(1, 10, 10)])).is_none());
        assert_eq!(engine.get(S1, P1), None);
    }

    #[test]
    fn non_decreasing_counters() {
        let mut engine = DeltaEngine::new();
        let old = snapshot(&[(1, 100, 50), (2, 0, 0)]);
        let new = snapshot(&[(1, 160, 90), (2, 0, 0)]);

        let deltas = engine.update(S1, Some(&old), &new).unwrap();
        assert_eq!(deltas.get(&P1), Some(&100));
        assert_eq!(deltas.get(&P2), Some(&0));
    }

    #[test]
    fn counter_reset_is_clamped() {
        let mut engine = DeltaEngine::new();
        let old = snapshot(&[(1, 1_000, 1_000)]);
        let new = snapshot(&[(1, 10, 5)]);

        engine.update(S1, Some(&old), &new);
        assert_eq!(engine.get(S1, P1), Some(0));
    }

    #[test]
    fn new_port_has_no_delta() {
        let mut engine = DeltaEngine::new();
        let old = snapshot(&[(1, 10, 10)]);
        let new = snapshot(&[(1, 20, 20), (2, 500, 500)]);

        engine.update(S1, Some(&old), &new);
        assert_eq!(engine.get(S1, P1), Some(20));
        assert_eq!(engine.get(S1, P2), None);
    }

    #[test]
    fn deltas_are_overwritten_each_cycle() {
        let mut engine = DeltaEngine::new();
        let s0 = snapshot(&[(1, 0, 0), (2, 0, 0)]);
        let s1 = snapshot(&[(1, 10, 0), (2, 10, 0)]);
        let s2 = snapshot(&[(1, 15, 0)]);

        engine.update(S1, Some(&s0), &s1);
        engine.update(S1, Some(&s1), &s2);

        assert_eq!(engine.get(S1, P1), Some(5));
        assert_eq!(
            engine.get(S1, P2),
            None,
            "port missing from the latest reply keeps no stale delta"
        );
    }

    #[test]
    fn clamped_delta_property() {
        for (old, new) in [(0, 0), (0, 7), (5, 5), (5, 9), (u64::MAX - 1, u64::MAX)] {
            assert_eq!(clamped_delta(old, new), new - old);
        }
        for (old, new) in [(1, 0), (u64::MAX, 0), (100, 99)] {
            assert_eq!(clamped_delta(old, new), 0);
        }
    }
}
