//! Control plane statistics and observability types.
//!
//! [`ControlPlaneStats`] provides a point-in-time snapshot of the control
//! plane. Obtain one via [`ControlPlane::stats`](crate::ControlPlane::stats).

use crate::{link::Link, port::PortNo, switch::{ConnectionState, SwitchId}};
use std::collections::BTreeMap;

/// Snapshot of statistics for a single switch.
#[derive(Debug, Clone)]
pub struct SwitchStats {
    /// The switch's datapath identifier.
    pub id: SwitchId,
    pub state: ConnectionState,
    /// Physical ports reported by the switch.
    pub ports: Vec<PortNo>,
    /// Learned addresses (expired entries not yet swept included).
    pub forwarding_entries: usize,
    /// Rules the controller installed on the switch.
    pub flow_rules: usize,
    /// Consecutive failed south-bound commands.
    pub failures: u32,
    /// Latest utilisation delta of each port.
    pub deltas: BTreeMap<PortNo, u64>,
}

/// Snapshot of statistics for a single directed link.
#[derive(Debug, Clone)]
pub struct LinkStats {
    pub link: Link,
    /// Latest delta of the egress port, if measured.
    pub delta: Option<u64>,
    /// Whether this link is the edge the current topology uses between
    /// its two switches.
    pub in_graph: bool,
}

/// Point-in-time snapshot of the entire control plane.
#[derive(Debug, Clone)]
pub struct ControlPlaneStats {
    pub switches: Vec<SwitchStats>,
    pub links: Vec<LinkStats>,
    /// Hosts with a known attachment point.
    pub hosts: usize,
    /// Generation of the topology snapshot in use.
    pub generation: u64,
}

impl ControlPlaneStats {
    pub fn switch(&self, id: SwitchId) -> Option<&SwitchStats> {
        self.switches.iter().find(|switch| switch.id == id)
    }

    pub fn active_switches(&self) -> usize {
        self.switches
            .iter()
            .filter(|switch| switch.state == ConnectionState::Active)
            .count()
    }
}
