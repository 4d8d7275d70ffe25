use crate::switch::SwitchId;
use std::{
    collections::{HashMap, VecDeque},
    hash::{DefaultHasher, Hash as _, Hasher as _},
    time::{Duration, Instant},
};

/// Stops a flooded frame from being flooded again by a switch it has
/// already gone through.
///
/// Each flood is remembered as `(switch, fingerprint of the frame)` for
/// `horizon`. A frame coming back to the same switch within that window
/// is a loop and is dropped. Memory is bounded both by the horizon and
/// by `capacity`: once full, the oldest fingerprints are forgotten first.
#[derive(Debug)]
pub struct FloodGuard {
    horizon: Duration,
    capacity: usize,
    seen: HashMap<(SwitchId, u64), Instant>,
    order: VecDeque<((SwitchId, u64), Instant)>,
}

pub fn fingerprint(payload: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    payload.hash(&mut hasher);
    hasher.finish()
}

impl FloodGuard {
    pub fn new(horizon: Duration, capacity: usize) -> Self {
        Self {
            horizon,
            capacity: capacity.max(1),
            seen: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// `true` if `switch` may flood `payload`, `false` if it already did
    /// within the horizon.
    pub fn admit(&mut self, switch: SwitchId, payload: &[u8], now: Instant) -> bool {
        self.prune(now);

        let key = (switch, fingerprint(payload));
        if self.seen.contains_key(&key) {
            return false;
        }

        while self.seen.len() >= self.capacity {
            let Some((oldest, at)) = self.order.pop_front() else {
                break;
            };
            if self.seen.get(&oldest) == Some(&at) {
                self.seen.remove(&oldest);
            }
        }

        self.seen.insert(key, now);
        self.order.push_back((key, now));
        true
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&(key, at)) = self.order.front() {
            if now.saturating_duration_since(at) < self.horizon {
                break;
            }
            self.order.pop_front();
            if self.seen.get(&key) == Some(&at) {
                self.seen.remove(&key);
            }
        }
    }

    pub fn remove_switch(&mut self, switch: SwitchId) {
        self.seen.retain(|(s, _), _| *s != switch);
        self.order.retain(|((s, _), _)| *s != switch);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HORIZON: Duration = Duration::from_secs(2);

    #[test]
    fn second_visit_is_a_loop() {
        let mut guard = FloodGuard::new(HORIZON, 16);
        let now = Instant::now();
        let s1 = SwitchId::new(1);
        let s2 = SwitchId::new(2);

        assert!(guard.admit(s1, b"frame", now));
        assert!(guard.admit(s2, b"frame", now), "another switch may flood it");
        assert!(guard.admit(s1, b"other", now));
        assert!(!guard.admit(s1, b"frame", now + Duration::from_millis(500)));
    }

    #[test]
    fn forgotten_after_horizon() {
        let mut guard = FloodGuard::new(HORIZON, 16);
        let now = Instant::now();
        let s1 = SwitchId::new(1);

        assert!(guard.admit(s1, b"frame", now));
        assert!(guard.admit(s1, b"frame", now + HORIZON));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn bounded_by_capacity() {
        let mut guard = FloodGuard::new(HORIZON, 2);
        let now = Instant::now();
        let s1 = SwitchId::new(1);

        assert!(guard.admit(s1, b"one", now));
        assert!(guard.admit(s1, b"two", now));
        assert!(guard.admit(s1, b"three", now));
        assert_eq!(guard.len(), 2);

        // the oldest was evicted
        assert!(guard.admit(s1, b"one", now));
        assert!(!guard.admit(s1, b"three", now));
    }

    #[test]
    fn remove_switch() {
        let mut guard = FloodGuard::new(HORIZON, 16);
        let now = Instant::now();

        guard.admit(SwitchId::new(1), b"frame", now);
        guard.admit(SwitchId::new(2), b"frame", now);
        guard.remove_switch(SwitchId::new(1));

        assert_eq!(guard.len(), 1);
        assert!(guard.admit(SwitchId::new(1), b"frame", now));
    }
}
