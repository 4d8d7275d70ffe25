use crate::topology::MissingWeight;
use std::time::Duration;

/// Default interval between two statistics cycles.
///
/// ```
/// # use sdnlb_core::{defaults::*, HumanDuration};
/// assert_eq!(HumanDuration::new(DEFAULT_POLL_INTERVAL).to_string(), "10s");
/// ```
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default window during which a switch will not flood the same frame
/// twice.
pub const DEFAULT_LOOP_HORIZON: Duration = Duration::from_secs(2);

/// Default number of flood fingerprints remembered at once.
pub const DEFAULT_LOOP_GUARD_CAPACITY: usize = 4096;

/// Default lifetime of a learned forwarding entry.
///
/// ```
/// # use sdnlb_core::{defaults::*, HumanDuration};
/// assert_eq!(HumanDuration::new(DEFAULT_FORWARDING_TTL).to_string(), "5m");
/// ```
pub const DEFAULT_FORWARDING_TTL: Duration = Duration::from_secs(300);

/// Default idle timeout of the rules derived from a path computation.
///
/// Once the traffic pauses for this long the switch drops the rule and
/// the next packet triggers a fresh path computation.
pub const DEFAULT_FLOW_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default weight policy for links without a delta yet.
pub const DEFAULT_MISSING_WEIGHT: MissingWeight = MissingWeight::Zero;

/// Default number of consecutive failed commands before the switch is
/// disconnected.
pub const DEFAULT_MAX_COMMAND_FAILURES: u32 = 3;
