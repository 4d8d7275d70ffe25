mod end;

pub use self::end::LinkEnd;
use crate::{port::PortNo, switch::SwitchId};
use std::{collections::BTreeSet, fmt};

/// A discovered, directed inter-switch link.
///
/// Discovery reports each direction of a physical cable separately: the
/// link `src → dst` means frames sent out of `src.port` on `src.switch`
/// arrive on `dst.port` of `dst.switch`. The utilisation of the link is
/// therefore read from the egress port, `src`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    pub src: LinkEnd,
    pub dst: LinkEnd,
}

impl Link {
    pub fn new(src: impl Into<LinkEnd>, dst: impl Into<LinkEnd>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// the same cable, seen from the other side
    #[must_use = "function does not modify the current value"]
    pub fn reversed(self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }

    pub fn touches(&self, switch: SwitchId) -> bool {
        self.src.switch == switch || self.dst.switch == switch
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// The set of links currently reported by topology discovery.
#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    links: BTreeSet<Link>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// returns `true` if the link was not known
    pub fn insert(&mut self, link: Link) -> bool {
        self.links.insert(link)
    }

    /// returns `true` if the link was known
    pub fn remove(&mut self, link: &Link) -> bool {
        self.links.remove(link)
    }

    /// Remove every link touching `switch`, returning how many were removed.
    pub fn remove_switch(&mut self, switch: SwitchId) -> usize {
        let before = self.links.len();
        self.links.retain(|link| !link.touches(switch));
        before - self.links.len()
    }

    /// Remove every link using `(switch, port)` on either side.
    pub fn remove_port(&mut self, switch: SwitchId, port: PortNo) -> usize {
        let end = LinkEnd { switch, port };
        let before = self.links.len();
        self.links.retain(|link| link.src != end && link.dst != end);
        before - self.links.len()
    }

    /// `true` if `(switch, port)` is one end of a discovered link, i.e. it
    /// faces another switch rather than a host.
    pub fn is_link_port(&self, switch: SwitchId, port: PortNo) -> bool {
        let end = LinkEnd { switch, port };
        self.links.iter().any(|link| link.src == end || link.dst == end)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(a: (u64, u32), b: (u64, u32)) -> Link {
        Link::new(LinkEnd::new(a.0, a.1), LinkEnd::new(b.0, b.1))
    }

    #[test]
    fn reversed() {
        let l = link((1, 2), (2, 1));
        assert_eq!(l.reversed(), link((2, 1), (1, 2)));
        assert_eq!(l.reversed().reversed(), l);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut links = LinkSet::new();
        assert!(links.insert(link((1, 2), (2, 1))));
        assert!(!links.insert(link((1, 2), (2, 1))));
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn remove_switch() {
        let mut links = LinkSet::new();
        links.insert(link((1, 2), (2, 1)));
        links.insert(link((2, 1), (1, 2)));
        links.insert(link((2, 2), (3, 1)));
        links.insert(link((3, 1), (2, 2)));

        assert_eq!(links.remove_switch(SwitchId::new(1)), 2);
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| !l.touches(SwitchId::new(1))));
    }

    #[test]
    fn link_ports() {
        let mut links = LinkSet::new();
        links.insert(link((1, 2), (2, 1)));

        assert!(links.is_link_port(SwitchId::new(1), PortNo::new(2)));
        assert!(links.is_link_port(SwitchId::new(2), PortNo::new(1)));
        assert!(!links.is_link_port(SwitchId::new(1), PortNo::new(1)));

        assert_eq!(links.remove_port(SwitchId::new(2), PortNo::new(1)), 1);
        assert!(links.is_empty());
    }
}
