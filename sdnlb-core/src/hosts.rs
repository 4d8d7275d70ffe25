use crate::{addr::MacAddr, link::LinkEnd, port::PortNo, switch::SwitchId};
use std::{collections::HashMap, net::Ipv4Addr};
use tracing::debug;

/// Where hosts are attached, and which hardware address answers for which
/// network address.
///
/// Attachment points come from explicit host discovery or are gleaned from
/// traffic entering the network on an edge port. The address bindings
/// back the proxy address-resolution responder.
#[derive(Debug, Default)]
pub struct HostTable {
    attachments: HashMap<MacAddr, LinkEnd>,
    bindings: HashMap<Ipv4Addr, MacAddr>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `address` is attached at `at`, returning the previous
    /// attachment point if it differs.
    pub fn attach(&mut self, address: MacAddr, at: LinkEnd) -> Option<LinkEnd> {
        match self.attachments.insert(address, at) {
            Some(previous) if previous != at => {
                debug!(%address, from = %previous, to = %at, "host attachment moved");
                Some(previous)
            }
            _ => None,
        }
    }

    pub fn locate(&self, address: MacAddr) -> Option<LinkEnd> {
        self.attachments.get(&address).copied()
    }

    /// Bind a network address to a hardware address (last writer wins).
    pub fn bind(&mut self, ip: Ipv4Addr, address: MacAddr) {
        if ip.is_unspecified() || address.is_multicast() {
            return;
        }
        self.bindings.insert(ip, address);
    }

    pub fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        self.bindings.get(&ip).copied()
    }

    /// Forget every host attached to `switch`.
    pub fn remove_switch(&mut self, switch: SwitchId) -> usize {
        let before = self.attachments.len();
        self.attachments.retain(|_, at| at.switch != switch);
        before - self.attachments.len()
    }

    /// Forget every host attached to `(switch, port)`.
    pub fn remove_port(&mut self, switch: SwitchId, port: PortNo) -> usize {
        let end = LinkEnd { switch, port };
        let before = self.attachments.len();
        self.attachments.retain(|_, at| *at != end);
        before - self.attachments.len()
    }

    pub fn attachments(&self) -> impl Iterator<Item = (MacAddr, LinkEnd)> + '_ {
        self.attachments.iter().map(|(mac, at)| (*mac, *at))
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: MacAddr = MacAddr::new([0, 0, 0, 0, 0, 0xa]);
    const B: MacAddr = MacAddr::new([0, 0, 0, 0, 0, 0xb]);

    #[test]
    fn attach_and_move() {
        let mut hosts = HostTable::new();

        assert_eq!(hosts.attach(A, LinkEnd::new(1, 1)), None);
        assert_eq!(hosts.attach(A, LinkEnd::new(1, 1)), None);
        assert_eq!(
            hosts.attach(A, LinkEnd::new(3, 2)),
            Some(LinkEnd::new(1, 1))
        );
        assert_eq!(hosts.locate(A), Some(LinkEnd::new(3, 2)));
        assert_eq!(hosts.locate(B), None);
    }

    #[test]
    fn bindings() {
        let mut hosts = HostTable::new();
        let ip = Ipv4Addr::new(10, 0, 0, 1);

        hosts.bind(ip, A);
        assert_eq!(hosts.resolve(ip), Some(A));

        hosts.bind(ip, B);
        assert_eq!(hosts.resolve(ip), Some(B));

        hosts.bind(Ipv4Addr::UNSPECIFIED, A);
        hosts.bind(Ipv4Addr::new(10, 0, 0, 2), MacAddr::BROADCAST);
        assert_eq!(hosts.resolve(Ipv4Addr::UNSPECIFIED), None);
        assert_eq!(hosts.resolve(Ipv4Addr::new(10, 0, 0, 2)), None);
    }

    #[test]
    fn remove_switch_keeps_bindings() {
        let mut hosts = HostTable::new();
        let ip = Ipv4Addr::new(10, 0, 0, 1);
        hosts.attach(A, LinkEnd::new(1, 1));
        hosts.attach(B, LinkEnd::new(2, 1));
        hosts.bind(ip, A);

        assert_eq!(hosts.remove_switch(SwitchId::new(1)), 1);
        assert_eq!(hosts.locate(A), None);
        assert_eq!(hosts.locate(B), Some(LinkEnd::new(2, 1)));
        assert_eq!(hosts.resolve(ip), Some(A));
    }

    #[test]
    fn remove_port() {
        let mut hosts = HostTable::new();
        hosts.attach(A, LinkEnd::new(1, 1));
        hosts.attach(B, LinkEnd::new(1, 2));

        assert_eq!(hosts.remove_port(SwitchId::new(1), PortNo::new(2)), 1);
        assert_eq!(hosts.len(), 1);
    }
}
