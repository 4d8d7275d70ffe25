//! Deterministic primitives of a load-aware SDN control plane.
//!
//! The crate keeps no threads and no clocks of its own: every operation
//! that depends on time takes an explicit `now`. The runtime (the `sdnlb`
//! crate) feeds [`Event`]s into a [`ControlPlane`] and sends the returned
//! [`Command`]s to the switches.
//!
//! ```
//! # use sdnlb_core::{Command, Config, ControlPlane, Event, FlowRule, SwitchId};
//! # use std::time::Instant;
//! let plane = ControlPlane::new(Config::default());
//! let switch = SwitchId::new(1);
//! let now = Instant::now();
//!
//! plane.handle(Event::SwitchConnected { switch }, now);
//! let commands = plane.handle(Event::FeaturesReply { switch, ports: vec![] }, now);
//!
//! assert_eq!(
//!     commands,
//!     vec![Command::InstallFlowRule { switch, rule: FlowRule::table_miss() }]
//! );
//! assert!(matches!(
//!     plane.poll(now).as_slice(),
//!     [Command::RequestPortStats { switch: polled, .. }] if *polled == switch
//! ));
//! ```

mod addr;
mod config;
pub mod defaults;
mod event;
pub mod flow;
mod forwarding;
mod hosts;
pub mod link;
mod loop_guard;
pub mod monitor;
pub mod packet;
mod plane;
mod port;
pub mod stats;
pub mod switch;
mod time;
pub mod topology;

pub use self::{
    addr::MacAddr,
    config::{Config, ConfigBuilder, UnknownDestination},
    event::{Command, Event, PacketData, PortChange},
    flow::{BufferId, FlowMatch, FlowRule, Output},
    forwarding::{ForwardingEntry, ForwardingTable, Learned},
    hosts::HostTable,
    link::{Link, LinkEnd, LinkSet},
    loop_guard::FloodGuard,
    monitor::{Ingest, PortMonitor, RequestId},
    plane::ControlPlane,
    port::{PortCounters, PortNo, PortStatsEntry},
    switch::{ConnectionState, SwitchId, SwitchRegistry},
    time::HumanDuration,
    topology::{MissingWeight, Path, PathError, TopologyGraph},
};
