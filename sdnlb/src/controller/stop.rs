use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown signal shared by the dispatcher and the poller threads.
#[derive(Debug)]
pub(crate) struct Stop(AtomicBool);

/// The flag is only ever set once and read in the threads' loops, there
/// is no data published alongside it.
const FETCH_ORDERING: Ordering = Ordering::Acquire;
const STORE_ORDERING: Ordering = Ordering::Release;

impl Stop {
    pub(crate) fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline]
    pub(crate) fn get(&self) -> bool {
        self.0.load(FETCH_ORDERING)
    }

    /// set the stop signal
    #[inline]
    pub(crate) fn toggle(&self) {
        self.0.store(true, STORE_ORDERING)
    }
}

impl Default for Stop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::bool_assert_comparison)]
    #[test]
    fn default() {
        assert_eq!(Stop::new().get(), false);
        assert_eq!(Stop::default().get(), false);
    }

    #[allow(clippy::bool_assert_comparison)]
    #[test]
    fn toggle_is_sticky() {
        let stop = Stop::new();

        stop.toggle();
        assert_eq!(stop.get(), true);
        stop.toggle();
        assert_eq!(stop.get(), true);
    }
}
