use super::{EtherType, ParseError, be16, ensure_len, ethernet};
use crate::addr::MacAddr;
use std::net::Ipv4Addr;

const PACKET_LEN: usize = 28;
const HARDWARE_ETHERNET: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOp {
    Request,
    Reply,
    Other(u16),
}

impl ArpOp {
    fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::Request,
            2 => Self::Reply,
            other => Self::Other(other),
        }
    }

    fn into_u16(self) -> u16 {
        match self {
            Self::Request => 1,
            Self::Reply => 2,
            Self::Other(other) => other,
        }
    }
}

/// An Ethernet/IPv4 address resolution packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub op: ArpOp,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        ensure_len(bytes, "arp", PACKET_LEN)?;

        let hardware = be16(bytes, 0);
        let protocol = be16(bytes, 2);
        if hardware != HARDWARE_ETHERNET
            || protocol != EtherType::IPV4.into_u16()
            || bytes[4] != 6
            || bytes[5] != 4
        {
            return Err(ParseError::UnsupportedArp { hardware, protocol });
        }

        let ip = |at: usize| Ipv4Addr::new(bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]);
        let mac = |at: usize| {
            MacAddr::from_slice(&bytes[at..at + 6]).ok_or(ParseError::Truncated {
                layer: "arp",
                needed: PACKET_LEN,
                got: bytes.len(),
            })
        };

        Ok(Self {
            op: ArpOp::from_u16(be16(bytes, 6)),
            sender_mac: mac(8)?,
            sender_ip: ip(14),
            target_mac: mac(18)?,
            target_ip: ip(24),
        })
    }

    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        let mut bytes = [0u8; PACKET_LEN];
        bytes[0..2].copy_from_slice(&HARDWARE_ETHERNET.to_be_bytes());
        bytes[2..4].copy_from_slice(&EtherType::IPV4.into_u16().to_be_bytes());
        bytes[4] = 6;
        bytes[5] = 4;
        bytes[6..8].copy_from_slice(&self.op.into_u16().to_be_bytes());
        bytes[8..14].copy_from_slice(&self.sender_mac.octets());
        bytes[14..18].copy_from_slice(&self.sender_ip.octets());
        bytes[18..24].copy_from_slice(&self.target_mac.octets());
        bytes[24..28].copy_from_slice(&self.target_ip.octets());
        bytes
    }

    /// Build the complete Ethernet frame answering this request on behalf
    /// of `resolved`, the owner of the queried address.
    pub fn reply_frame(&self, resolved: MacAddr) -> Vec<u8> {
        let reply = Self {
            op: ArpOp::Reply,
            sender_mac: resolved,
            sender_ip: self.target_ip,
            target_mac: self.sender_mac,
            target_ip: self.sender_ip,
        };

        let mut frame = Vec::with_capacity(ethernet::HEADER_LEN + PACKET_LEN);
        frame.extend_from_slice(&self.sender_mac.octets());
        frame.extend_from_slice(&resolved.octets());
        frame.extend_from_slice(&EtherType::ARP.into_u16().to_be_bytes());
        frame.extend_from_slice(&reply.to_bytes());
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Frame, Payload};

    const A: MacAddr = MacAddr::new([0, 0, 0, 0, 0, 0xa]);
    const B: MacAddr = MacAddr::new([0, 0, 0, 0, 0, 0xb]);

    fn request() -> ArpPacket {
        ArpPacket {
            op: ArpOp::Request,
            sender_mac: A,
            sender_ip: Ipv4Addr::new(10, 0, 0, 1),
            target_mac: MacAddr::ZERO,
            target_ip: Ipv4Addr::new(10, 0, 0, 2),
        }
    }

    #[test]
    fn parse_back() {
        let packet = request();
        assert_eq!(ArpPacket::parse(&packet.to_bytes()).unwrap(), packet);
    }

    #[test]
    fn reply_is_addressed_to_requester() {
        let bytes = request().reply_frame(B);
        let frame = Frame::parse(&bytes).unwrap();

        assert_eq!(frame.destination, A);
        assert_eq!(frame.source, B);
        let Payload::Arp(reply) = frame.payload else {
            panic!("expected an ARP payload, got {:?}", frame.payload)
        };
        assert_eq!(reply.op, ArpOp::Reply);
        assert_eq!(reply.sender_mac, B);
        assert_eq!(reply.sender_ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(reply.target_mac, A);
        assert_eq!(reply.target_ip, Ipv4Addr::new(10, 0, 0, 1));
    }

    #[test]
    fn unsupported_hardware() {
        let mut bytes = request().to_bytes();
        bytes[1] = 6;

        assert_eq!(
            ArpPacket::parse(&bytes),
            Err(ParseError::UnsupportedArp {
                hardware: 6,
                protocol: 0x0800
            })
        );
    }
}
