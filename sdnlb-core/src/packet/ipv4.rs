use super::{ParseError, be16, ensure_len};
use std::{fmt, net::Ipv4Addr};

const MIN_HEADER_LEN: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IpProtocol(u8);

impl IpProtocol {
    pub const ICMP: Self = Self(1);
    pub const TCP: Self = Self(6);
    pub const UDP: Self = Self(17);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    pub fn has_ports(&self) -> bool {
        *self == Self::TCP || *self == Self::UDP
    }
}

impl fmt::Debug for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ICMP => f.write_str("ICMP"),
            Self::TCP => f.write_str("TCP"),
            Self::UDP => f.write_str("UDP"),
            Self(other) => write!(f, "IpProtocol({other})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportPorts {
    pub source: u16,
    pub destination: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Packet {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: IpProtocol,
    /// transport ports, only for the first fragment of TCP and UDP
    pub ports: Option<TransportPorts>,
}

impl Ipv4Packet {
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        ensure_len(bytes, "ipv4", MIN_HEADER_LEN)?;

        let version = bytes[0] >> 4;
        if version != 4 {
            return Err(ParseError::NotIpv4 { version });
        }
        let header_len = usize::from(bytes[0] & 0x0f) * 4;
        if header_len < MIN_HEADER_LEN {
            return Err(ParseError::InvalidHeaderLength { length: header_len });
        }
        ensure_len(bytes, "ipv4", header_len)?;

        let protocol = IpProtocol(bytes[9]);
        let fragment_offset = be16(bytes, 6) & 0x1fff;
        let ip = |at: usize| Ipv4Addr::new(bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]);

        let transport = &bytes[header_len..];
        let ports = if protocol.has_ports() && fragment_offset == 0 && transport.len() >= 4 {
            Some(TransportPorts {
                source: be16(transport, 0),
                destination: be16(transport, 2),
            })
        } else {
            None
        };

        Ok(Self {
            source: ip(12),
            destination: ip(16),
            protocol,
            ports,
        })
    }
}
