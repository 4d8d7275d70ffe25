//! What the protocol transport hands to the control plane, and what the
//! control plane asks it to do in return.

use crate::{
    addr::MacAddr,
    flow::{BufferId, FlowRule, Output},
    link::{Link, LinkEnd},
    monitor::RequestId,
    port::{PortNo, PortStatsEntry},
    switch::SwitchId,
};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortChange {
    Added,
    Deleted,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// transport connection opened, feature negotiation pending
    SwitchConnected { switch: SwitchId },
    /// feature negotiation completed
    FeaturesReply { switch: SwitchId, ports: Vec<PortNo> },
    SwitchDisconnected { switch: SwitchId },
    PacketIn {
        switch: SwitchId,
        in_port: PortNo,
        payload: Vec<u8>,
        buffer: Option<BufferId>,
    },
    PortStatsReply {
        switch: SwitchId,
        /// echoed from the [`Command::RequestPortStats`] being answered
        request: RequestId,
        entries: Vec<PortStatsEntry>,
    },
    PortStatus {
        switch: SwitchId,
        port: PortNo,
        change: PortChange,
    },
    LinkDiscovered(Link),
    LinkRemoved(Link),
    HostDiscovered {
        address: MacAddr,
        ipv4: Option<Ipv4Addr>,
        at: LinkEnd,
    },
}

impl Event {
    /// the switch this event originates from, if any
    pub fn switch(&self) -> Option<SwitchId> {
        match self {
            Self::SwitchConnected { switch }
            | Self::FeaturesReply { switch, .. }
            | Self::SwitchDisconnected { switch }
            | Self::PacketIn { switch, .. }
            | Self::PortStatsReply { switch, .. }
            | Self::PortStatus { switch, .. } => Some(*switch),
            Self::HostDiscovered { at, .. } => Some(at.switch),
            Self::LinkDiscovered(_) | Self::LinkRemoved(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SwitchConnected { .. } => "switch-connected",
            Self::FeaturesReply { .. } => "features-reply",
            Self::SwitchDisconnected { .. } => "switch-disconnected",
            Self::PacketIn { .. } => "packet-in",
            Self::PortStatsReply { .. } => "port-stats-reply",
            Self::PortStatus { .. } => "port-status",
            Self::LinkDiscovered(_) => "link-discovered",
            Self::LinkRemoved(_) => "link-removed",
            Self::HostDiscovered { .. } => "host-discovered",
        }
    }
}

/// The packet a packet-out carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketData {
    /// release a packet held in the switch's buffer
    Buffered(BufferId),
    Raw(Vec<u8>),
}

impl PacketData {
    /// prefer the switch's buffer over shipping the bytes back
    pub fn new(buffer: Option<BufferId>, payload: &[u8]) -> Self {
        match buffer {
            Some(buffer) => Self::Buffered(buffer),
            None => Self::Raw(payload.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    InstallFlowRule {
        switch: SwitchId,
        rule: FlowRule,
    },
    PacketOut {
        switch: SwitchId,
        /// the port the packet came in on (excluded when flooding)
        in_port: Option<PortNo>,
        data: PacketData,
        output: Output,
    },
    RequestPortStats {
        switch: SwitchId,
        request: RequestId,
    },
    /// tear the connection down
    Disconnect {
        switch: SwitchId,
    },
}

impl Command {
    pub fn switch(&self) -> SwitchId {
        match self {
            Self::InstallFlowRule { switch, .. }
            | Self::PacketOut { switch, .. }
            | Self::RequestPortStats { switch, .. }
            | Self::Disconnect { switch } => *switch,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InstallFlowRule { .. } => "install-flow-rule",
            Self::PacketOut { .. } => "packet-out",
            Self::RequestPortStats { .. } => "request-port-stats",
            Self::Disconnect { .. } => "disconnect",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_data_prefers_buffer() {
        assert_eq!(
            PacketData::new(Some(BufferId::new(3)), &[1, 2]),
            PacketData::Buffered(BufferId::new(3))
        );
        assert_eq!(PacketData::new(None, &[1, 2]), PacketData::Raw(vec![1, 2]));
    }

    #[test]
    fn event_switch() {
        let link = Link::new(LinkEnd::new(1, 2), LinkEnd::new(2, 1));
        assert_eq!(Event::LinkDiscovered(link).switch(), None);
        assert_eq!(
            Event::HostDiscovered {
                address: MacAddr::ZERO,
                ipv4: None,
                at: LinkEnd::new(4, 1)
            }
            .switch(),
            Some(SwitchId::new(4))
        );
    }
}
