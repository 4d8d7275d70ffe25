//! Decoding of the frames switches hand to the controller.
//!
//! Only what the dispatcher needs is decoded: the Ethernet header, the
//! address-resolution body, and the IPv4 header with the transport ports
//! of TCP and UDP segments. Everything else is carried as
//! [`Payload::Other`].

mod arp;
mod ethernet;
mod ipv4;

pub use self::{
    arp::{ArpOp, ArpPacket},
    ethernet::EtherType,
    ipv4::{IpProtocol, Ipv4Packet, TransportPorts},
};
use crate::addr::MacAddr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("truncated {layer} header: need {needed} bytes, got {got}")]
    Truncated {
        layer: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("unsupported address resolution (hardware {hardware:#06x}, protocol {protocol:#06x})")]
    UnsupportedArp { hardware: u16, protocol: u16 },
    #[error("not an IPv4 header (version {version})")]
    NotIpv4 { version: u8 },
    #[error("invalid IPv4 header length ({length} bytes)")]
    InvalidHeaderLength { length: usize },
}

pub(crate) fn ensure_len(
    bytes: &[u8],
    layer: &'static str,
    needed: usize,
) -> Result<(), ParseError> {
    if bytes.len() < needed {
        Err(ParseError::Truncated {
            layer,
            needed,
            got: bytes.len(),
        })
    } else {
        Ok(())
    }
}

#[inline]
pub(crate) fn be16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// The decoded layers of an Ethernet frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub ether_type: EtherType,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// link-layer discovery traffic, never learned or forwarded
    Discovery,
    Arp(ArpPacket),
    Ipv4(Ipv4Packet),
    Other,
}

impl Frame {
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let (header, body) = ethernet::Header::parse(bytes)?;

        let payload = match header.ether_type {
            EtherType::LLDP | EtherType::BDDP => Payload::Discovery,
            EtherType::ARP => Payload::Arp(ArpPacket::parse(body)?),
            EtherType::IPV4 => Payload::Ipv4(Ipv4Packet::parse(body)?),
            _ => Payload::Other,
        };

        Ok(Self {
            destination: header.destination,
            source: header.source,
            ether_type: header.ether_type,
            payload,
        })
    }

    pub fn is_discovery(&self) -> bool {
        matches!(self.payload, Payload::Discovery)
    }
}

#[cfg(test)]
pub(crate) mod test_frames {
    //! Builders for the frames used across the crate's tests.

    use super::*;
    use std::net::Ipv4Addr;

    pub fn ethernet(dst: MacAddr, src: MacAddr, ether_type: u16, body: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(14 + body.len());
        bytes.extend_from_slice(&dst.octets());
        bytes.extend_from_slice(&src.octets());
        bytes.extend_from_slice(&ether_type.to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    pub fn arp_request(src: MacAddr, src_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
        let packet = ArpPacket {
            op: ArpOp::Request,
            sender_mac: src,
            sender_ip: src_ip,
            target_mac: MacAddr::ZERO,
            target_ip,
        };
        ethernet(MacAddr::BROADCAST, src, EtherType::ARP.into_u16(), &packet.to_bytes())
    }

    pub fn ipv4(
        dst: MacAddr,
        src: MacAddr,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        protocol: u8,
        ports: Option<(u16, u16)>,
    ) -> Vec<u8> {
        let mut body = vec![0u8; 20];
        body[0] = 0x45;
        body[8] = 64;
        body[9] = protocol;
        body[12..16].copy_from_slice(&src_ip.octets());
        body[16..20].copy_from_slice(&dst_ip.octets());
        if let Some((sport, dport)) = ports {
            body.extend_from_slice(&sport.to_be_bytes());
            body.extend_from_slice(&dport.to_be_bytes());
            body.extend_from_slice(&[0; 4]);
        }
        let total = body.len() as u16;
        body[2..4].copy_from_slice(&total.to_be_bytes());
        ethernet(dst, src, EtherType::IPV4.into_u16(), &body)
    }

    pub fn lldp(src: MacAddr) -> Vec<u8> {
        let nearest_bridge = MacAddr::new([0x01, 0x80, 0xc2, 0, 0, 0x0e]);
        ethernet(nearest_bridge, src, EtherType::LLDP.into_u16(), &[0x02, 0x07, 0x04])
    }
}
