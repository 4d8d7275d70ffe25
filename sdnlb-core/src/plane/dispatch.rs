use super::ControlPlane;
use crate::{
    addr::MacAddr,
    config::UnknownDestination,
    event::{Command, PacketData},
    flow::{BufferId, FlowMatch, FlowRule, Output},
    forwarding::Learned,
    link::LinkEnd,
    packet::{ArpOp, ArpPacket, Frame, Payload},
    port::PortNo,
    switch::SwitchId,
    topology::Path,
};
use std::time::Instant;
use tracing::{debug, trace};

/// Where the destination of a packet is, seen from the receiving switch.
#[derive(Debug)]
enum Destination {
    Local(PortNo),
    Remote(Path),
    Unknown,
}

/// A packet being dispatched.
struct Inbound<'a> {
    switch: SwitchId,
    in_port: PortNo,
    payload: &'a [u8],
    buffer: Option<BufferId>,
    frame: Frame,
}

impl ControlPlane {
    pub(super) fn packet_in(
        &self,
        switch: SwitchId,
        in_port: PortNo,
        payload: &[u8],
        buffer: Option<BufferId>,
        now: Instant,
    ) -> Vec<Command> {
        // held for the whole decision so an unregister cannot interleave
        let registry = self.registry.read();
        if !registry.is_active(switch) {
            debug!(%switch, %in_port, "packet from an inactive datapath");
            return Vec::new();
        }

        let frame = match Frame::parse(payload) {
            Ok(frame) => frame,
            Err(error) => {
                debug!(%switch, %in_port, %error, "dropping malformed packet");
                return Vec::new();
            }
        };

        let packet = Inbound {
            switch,
            in_port,
            payload,
            buffer,
            frame,
        };

        match packet.frame.payload {
            Payload::Discovery => {
                trace!(%switch, %in_port, "dropping discovery frame");
                Vec::new()
            }
            Payload::Arp(arp) => self.address_resolution(&packet, arp, now),
            Payload::Ipv4(_) | Payload::Other => self.forward(&packet, now),
        }
    }

    fn learn(&self, switch: SwitchId, in_port: PortNo, source: MacAddr, now: Instant) {
        if source.is_multicast() {
            return;
        }

        let learned = self.forwarding.lock().learn(switch, source, in_port, now);
        if let Learned::Moved { from } = learned {
            debug!(%switch, address = %source, %from, to = %in_port, "address moved");
        }

        let mut hosts = self.hosts.write();
        if !self.links.read().is_link_port(switch, in_port) {
            hosts.attach(source, LinkEnd { switch, port: in_port });
        }
    }

    fn address_resolution(
        &self,
        packet: &Inbound<'_>,
        arp: ArpPacket,
        now: Instant,
    ) -> Vec<Command> {
        let Inbound {
            switch, in_port, ..
        } = *packet;

        self.learn(switch, in_port, packet.frame.source, now);
        self.hosts.write().bind(arp.sender_ip, arp.sender_mac);

        if arp.op != ArpOp::Request || arp.sender_ip == arp.target_ip {
            trace!(%switch, sender = %arp.sender_ip, "address binding gleaned");
            return Vec::new();
        }

        match self.hosts.read().resolve(arp.target_ip) {
            Some(resolved) if resolved != arp.sender_mac => {
                debug!(
                    %switch,
                    %in_port,
                    target = %arp.target_ip,
                    %resolved,
                    "proxy address resolution reply"
                );
                vec![Command::PacketOut {
                    switch,
                    in_port: None,
                    data: PacketData::Raw(arp.reply_frame(resolved)),
                    output: Output::Port(in_port),
                }]
            }
            _ => {
                debug!(%switch, target = %arp.target_ip, "unresolved address, dropping request");
                Vec::new()
            }
        }
    }

    fn forward(&self, packet: &Inbound<'_>, now: Instant) -> Vec<Command> {
        let Inbound {
            switch,
            in_port,
            payload,
            buffer,
            ref frame,
        } = *packet;

        self.learn(switch, in_port, frame.source, now);

        let port = match self.resolve(switch, frame.destination, now) {
            Destination::Unknown => return self.unknown_destination(packet, now),
            Destination::Local(port) => port,
            Destination::Remote(path) => {
                debug!(
                    %switch,
                    next_hop = %path.next_hop(),
                    hops = path.hops().len(),
                    cost = path.cost(),
                    "path selected"
                );
                path.egress_port()
            }
        };

        if port == in_port {
            debug!(
                %switch,
                %in_port,
                destination = %frame.destination,
                "destination behind ingress port, dropping"
            );
            return Vec::new();
        }

        let (matcher, priority) = FlowMatch::for_frame(in_port, frame);
        let rule = FlowRule::new(priority, matcher, Output::Port(port))
            .with_idle_timeout(self.config.flow_idle_timeout());

        match buffer {
            // the switch releases the buffered packet through the new rule
            Some(_) => vec![self.install(switch, rule.with_buffer(buffer), now)],
            None => vec![
                self.install(switch, rule, now),
                Command::PacketOut {
                    switch,
                    in_port: Some(in_port),
                    data: PacketData::Raw(payload.to_vec()),
                    output: Output::Port(port),
                },
            ],
        }
    }

    /// Resolution order: a forwarding entry pointing at an edge port of
    /// this switch, then the host attachment (locally or through the path
    /// selector), then a forwarding entry pointing into the network.
    ///
    /// A host attached to a switch out of reach is unknown, whatever
    /// this switch learned about it.
    fn resolve(&self, switch: SwitchId, destination: MacAddr, now: Instant) -> Destination {
        if destination.is_multicast() {
            return Destination::Unknown;
        }

        let learned = self.forwarding.lock().lookup(switch, destination, now);
        let hosts = self.hosts.read();
        let links = self.links.read();

        if let Some(port) = learned
            && !links.is_link_port(switch, port)
        {
            return Destination::Local(port);
        }

        if let Some(at) = hosts.locate(destination) {
            if at.switch == switch {
                return Destination::Local(at.port);
            }
            return match self.graph.load().shortest_path(switch, at.switch) {
                Ok(path) => Destination::Remote(path),
                Err(error) => {
                    debug!(%switch, %destination, %error, "no path to host");
                    Destination::Unknown
                }
            };
        }

        learned.map_or(Destination::Unknown, Destination::Local)
    }

    fn unknown_destination(&self, packet: &Inbound<'_>, now: Instant) -> Vec<Command> {
        let Inbound {
            switch,
            in_port,
            payload,
            buffer,
            ..
        } = *packet;
        let destination = packet.frame.destination;

        match self.config.unknown_destination() {
            UnknownDestination::Drop => {
                debug!(%switch, %destination, "unknown destination, dropping");
                Vec::new()
            }
            UnknownDestination::Flood => {
                if !self.flood_guard.lock().admit(switch, payload, now) {
                    debug!(%switch, %in_port, %destination, "flood loop detected, dropping");
                    return Vec::new();
                }

                debug!(%switch, %in_port, %destination, "unknown destination, flooding");
                vec![Command::PacketOut {
                    switch,
                    in_port: Some(in_port),
                    data: PacketData::new(buffer, payload),
                    output: Output::Flood,
                }]
            }
        }
    }
}
