use super::{ParseError, be16, ensure_len};
use crate::addr::MacAddr;
use std::fmt;

pub(super) const HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EtherType(u16);

impl EtherType {
    pub const IPV4: Self = Self(0x0800);
    pub const ARP: Self = Self(0x0806);
    pub const VLAN: Self = Self(0x8100);
    pub const LLDP: Self = Self(0x88cc);
    /// broadcast domain discovery, the flooded variant of LLDP
    pub const BDDP: Self = Self(0x8942);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn into_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EtherType({:#06x})", self.0)
    }
}

pub(super) struct Header {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub ether_type: EtherType,
}

impl Header {
    /// decode the header, skipping a single 802.1Q tag, and return the
    /// remaining bytes
    pub fn parse(bytes: &[u8]) -> Result<(Self, &[u8]), ParseError> {
        ensure_len(bytes, "ethernet", HEADER_LEN)?;

        let destination = MacAddr::from_slice(&bytes[0..6]).ok_or(ParseError::Truncated {
            layer: "ethernet",
            needed: HEADER_LEN,
            got: bytes.len(),
        })?;
        let source = MacAddr::from_slice(&bytes[6..12]).ok_or(ParseError::Truncated {
            layer: "ethernet",
            needed: HEADER_LEN,
            got: bytes.len(),
        })?;

        let mut ether_type = EtherType(be16(bytes, 12));
        let mut offset = HEADER_LEN;
        if ether_type == EtherType::VLAN {
            ensure_len(bytes, "vlan", HEADER_LEN + VLAN_TAG_LEN)?;
            ether_type = EtherType(be16(bytes, HEADER_LEN + 2));
            offset += VLAN_TAG_LEN;
        }

        Ok((
            Self {
                destination,
                source,
                ether_type,
            },
            &bytes[offset..],
        ))
    }
}
