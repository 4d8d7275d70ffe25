use std::fmt;

/// A port number on a switch.
///
/// Physical ports are numbered from `1`; the values at the top of the
/// range are reserved by the protocol for logical ports (see the
/// associated constants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortNo(u32);

impl PortNo {
    /// highest number a physical port can have
    pub const MAX: Self = Self(0xffff_ff00);
    /// the switch's own local networking stack
    pub const LOCAL: Self = Self(0xffff_fffe);

    pub const fn new(port: u32) -> Self {
        Self(port)
    }

    #[inline]
    pub const fn into_u32(self) -> u32 {
        self.0
    }

    /// `true` for ports that can carry host or inter-switch traffic.
    #[inline]
    pub const fn is_physical(&self) -> bool {
        self.0 != 0 && self.0 <= Self::MAX.0
    }
}

impl From<u32> for PortNo {
    fn from(port: u32) -> Self {
        Self(port)
    }
}

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LOCAL => f.write_str("local"),
            Self(port) => port.fmt(f),
        }
    }
}

/// Raw, monotonically increasing traffic counters of a single port as
/// reported by the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
}

impl PortCounters {
    /// The utilisation metric used across the control plane: bytes
    /// received plus bytes transmitted.
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.rx_bytes.saturating_add(self.tx_bytes)
    }
}

/// One entry of a port statistics reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStatsEntry {
    pub port: PortNo,
    pub counters: PortCounters,
}

impl PortStatsEntry {
    pub fn new(port: impl Into<PortNo>, counters: PortCounters) -> Self {
        Self {
            port: port.into(),
            counters,
        }
    }

    /// convenience constructor for byte counters only (packet counters
    /// left to `0`)
    pub fn bytes(port: impl Into<PortNo>, rx_bytes: u64, tx_bytes: u64) -> Self {
        Self::new(
            port,
            PortCounters {
                rx_bytes,
                tx_bytes,
                ..PortCounters::default()
            },
        )
    }
}
