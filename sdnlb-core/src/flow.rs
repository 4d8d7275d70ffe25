//! Forwarding rules and the per-switch ledger of installed rules.

use crate::{
    addr::MacAddr,
    packet::{EtherType, Frame, IpProtocol, Payload},
    port::PortNo,
    switch::SwitchId,
};
use std::{
    collections::{HashMap, hash_map},
    fmt,
    net::Ipv4Addr,
    time::{Duration, Instant},
};

/// the catch-all rule sending unmatched packets to the controller
pub const PRIORITY_TABLE_MISS: u16 = 0;
/// learning-stage rules matching on ingress port and hardware addresses
pub const PRIORITY_L2: u16 = 1;
/// network address pair (ICMP and other non-port protocols)
pub const PRIORITY_IPV4: u16 = 10;
/// full TCP/UDP 5-tuple
pub const PRIORITY_TRANSPORT: u16 = 20;

pub const DEFAULT_TABLE: u8 = 0;

/// A packet held in a switch's buffer, waiting for the controller's
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u32);

impl BufferId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn into_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    Port(PortNo),
    /// every port except the ingress port
    Flood,
    Controller,
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port(port) => write!(f, "port {port}"),
            Self::Flood => f.write_str("flood"),
            Self::Controller => f.write_str("controller"),
        }
    }
}

/// Match predicate of a flow rule. Absent fields are wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlowMatch {
    pub in_port: Option<PortNo>,
    pub eth_src: Option<MacAddr>,
    pub eth_dst: Option<MacAddr>,
    pub eth_type: Option<EtherType>,
    pub ipv4_src: Option<Ipv4Addr>,
    pub ipv4_dst: Option<Ipv4Addr>,
    pub ip_proto: Option<IpProtocol>,
    pub tp_src: Option<u16>,
    pub tp_dst: Option<u16>,
}

impl FlowMatch {
    /// matches every packet
    pub fn any() -> Self {
        Self::default()
    }

    pub fn in_port(mut self, port: PortNo) -> Self {
        self.in_port = Some(port);
        self
    }

    pub fn eth_pair(mut self, src: MacAddr, dst: MacAddr) -> Self {
        self.eth_src = Some(src);
        self.eth_dst = Some(dst);
        self
    }

    pub fn ipv4_pair(mut self, src: Ipv4Addr, dst: Ipv4Addr, proto: IpProtocol) -> Self {
        self.eth_type = Some(EtherType::IPV4);
        self.ipv4_src = Some(src);
        self.ipv4_dst = Some(dst);
        self.ip_proto = Some(proto);
        self
    }

    pub fn transport(mut self, src: u16, dst: u16) -> Self {
        self.tp_src = Some(src);
        self.tp_dst = Some(dst);
        self
    }

    /// The most precise match describing `frame` as it entered on
    /// `in_port`, with the priority that goes with it: the 5-tuple for
    /// TCP and UDP, the address pair for other IPv4 traffic and the
    /// hardware address pair otherwise.
    pub fn for_frame(in_port: PortNo, frame: &Frame) -> (Self, u16) {
        let matcher = Self::any()
            .in_port(in_port)
            .eth_pair(frame.source, frame.destination);

        match &frame.payload {
            Payload::Ipv4(ip) => {
                let matcher = matcher.ipv4_pair(ip.source, ip.destination, ip.protocol);
                match ip.ports {
                    Some(ports) => (
                        matcher.transport(ports.source, ports.destination),
                        PRIORITY_TRANSPORT,
                    ),
                    None => (matcher, PRIORITY_IPV4),
                }
            }
            _ => (matcher, PRIORITY_L2),
        }
    }

    pub fn is_any(&self) -> bool {
        *self == Self::any()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRule {
    pub table: u8,
    pub priority: u16,
    pub matcher: FlowMatch,
    pub output: Output,
    /// release this buffered packet through the new rule
    pub buffer: Option<BufferId>,
    pub idle_timeout: Option<Duration>,
}

impl FlowRule {
    pub fn new(priority: u16, matcher: FlowMatch, output: Output) -> Self {
        Self {
            table: DEFAULT_TABLE,
            priority,
            matcher,
            output,
            buffer: None,
            idle_timeout: None,
        }
    }

    /// the rule sending every unmatched packet to the controller
    pub fn table_miss() -> Self {
        Self::new(PRIORITY_TABLE_MISS, FlowMatch::any(), Output::Controller)
    }

    pub fn with_buffer(mut self, buffer: Option<BufferId>) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn key(&self) -> FlowKey {
        FlowKey {
            table: self.table,
            priority: self.priority,
            matcher: self.matcher,
        }
    }
}

/// Identity of a rule within a switch: installing a rule with the same
/// key replaces the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub table: u8,
    pub priority: u16,
    pub matcher: FlowMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    New,
    Replaced,
    Unchanged,
}

/// Rules the controller has asked each switch to install.
///
/// A rule with an idle timeout is forgotten once that long has passed
/// since it was last installed. Traffic keeping the rule alive on the
/// switch never reaches the controller, so such a rule may outlive its
/// entry here.
#[derive(Debug, Default)]
pub struct FlowLedger {
    rules: HashMap<SwitchId, HashMap<FlowKey, Installed>>,
}

#[derive(Debug)]
struct Installed {
    rule: FlowRule,
    at: Instant,
}

impl Installed {
    fn is_idle(&self, now: Instant) -> bool {
        self.rule
            .idle_timeout
            .is_some_and(|timeout| now.saturating_duration_since(self.at) >= timeout)
    }
}

impl FlowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, switch: SwitchId, rule: FlowRule, now: Instant) -> Recorded {
        // the buffer is consumed by the first install, not part of the rule
        let rule = rule.with_buffer(None);
        match self.rules.entry(switch).or_default().entry(rule.key()) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert(Installed { rule, at: now });
                Recorded::New
            }
            hash_map::Entry::Occupied(mut entry) => {
                let installed = entry.get_mut();
                installed.at = now;
                if installed.rule == rule {
                    Recorded::Unchanged
                } else {
                    installed.rule = rule;
                    Recorded::Replaced
                }
            }
        }
    }

    /// Forget the rules idle for longer than their timeout, returning how
    /// many were dropped.
    pub fn expire(&mut self, now: Instant) -> usize {
        let mut expired = 0;
        self.rules.retain(|_, rules| {
            let before = rules.len();
            rules.retain(|_, installed| !installed.is_idle(now));
            expired += before - rules.len();
            !rules.is_empty()
        });
        expired
    }

    pub fn get(&self, switch: SwitchId, key: &FlowKey) -> Option<&FlowRule> {
        self.rules
            .get(&switch)?
            .get(key)
            .map(|installed| &installed.rule)
    }

    pub fn rules(&self, switch: SwitchId) -> impl Iterator<Item = &FlowRule> {
        self.rules
            .get(&switch)
            .into_iter()
            .flat_map(|rules| rules.values().map(|installed| &installed.rule))
    }

    pub fn count(&self, switch: SwitchId) -> usize {
        self.rules.get(&switch).map_or(0, HashMap::len)
    }

    pub fn remove_switch(&mut self, switch: SwitchId) -> usize {
        self.rules.remove(&switch).map_or(0, |rules| rules.len())
    }
}
