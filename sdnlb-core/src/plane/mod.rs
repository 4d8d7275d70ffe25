//! The control plane: one shared state machine fed with [`Event`]s and
//! answering with [`Command`]s.
//!
//! [`ControlPlane`] is `Sync`. The runtime drives it from several threads
//! at once (packet dispatching on one side, statistics polling on the
//! other), every operation takes `&self` and an explicit `now`.
//!
//! # Locking
//!
//! Each component sits behind its own lock. When more than one is held
//! they are always acquired in this order:
//!
//! `registry → forwarding → hosts → monitor → links → flood_guard → flows`
//!
//! The topology graph is never locked by readers for longer than it takes
//! to clone an `Arc`: path computations run on a snapshot while the next
//! graph is built and published.

mod dispatch;

use crate::{
    addr::MacAddr,
    config::Config,
    event::{Command, Event, PortChange},
    flow::{FlowLedger, FlowRule, Recorded},
    forwarding::ForwardingTable,
    hosts::HostTable,
    link::{Link, LinkEnd, LinkSet},
    loop_guard::FloodGuard,
    monitor::{Ingest, PortMonitor, RequestId},
    port::{PortNo, PortStatsEntry},
    stats::{ControlPlaneStats, LinkStats, SwitchStats},
    switch::{SwitchId, SwitchRegistry},
    topology::{SnapshotCell, TopologyGraph},
};
use parking_lot::{Mutex, RwLock};
use std::{net::Ipv4Addr, sync::Arc, time::Instant};
use tracing::{debug, info, trace, warn};

pub struct ControlPlane {
    config: Config,

    registry: RwLock<SwitchRegistry>,
    forwarding: Mutex<ForwardingTable>,
    hosts: RwLock<HostTable>,
    monitor: Mutex<PortMonitor>,
    links: RwLock<LinkSet>,
    flood_guard: Mutex<FloodGuard>,
    flows: Mutex<FlowLedger>,

    graph: SnapshotCell,
}

impl ControlPlane {
    pub fn new(config: Config) -> Self {
        Self {
            registry: RwLock::new(SwitchRegistry::new()),
            forwarding: Mutex::new(ForwardingTable::new(config.forwarding_ttl())),
            hosts: RwLock::new(HostTable::new()),
            monitor: Mutex::new(PortMonitor::new()),
            links: RwLock::new(LinkSet::new()),
            flood_guard: Mutex::new(FloodGuard::new(
                config.loop_horizon(),
                config.loop_guard_capacity(),
            )),
            flows: Mutex::new(FlowLedger::new()),
            graph: SnapshotCell::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one south-bound event, returning the commands to send.
    pub fn handle(&self, event: Event, now: Instant) -> Vec<Command> {
        trace!(kind = event.kind(), switch = ?event.switch(), "handle event");

        match event {
            Event::SwitchConnected { switch } => {
                self.registry.write().register(switch);
                Vec::new()
            }
            Event::FeaturesReply { switch, ports } => self.on_features(switch, ports, now),
            Event::SwitchDisconnected { switch } => {
                self.unregister(switch);
                Vec::new()
            }
            Event::PacketIn {
                switch,
                in_port,
                payload,
                buffer,
            } => self.packet_in(switch, in_port, &payload, buffer, now),
            Event::PortStatsReply {
                switch,
                request,
                entries,
            } => {
                self.on_port_stats(switch, request, entries, now);
                Vec::new()
            }
            Event::PortStatus {
                switch,
                port,
                change,
            } => {
                self.on_port_status(switch, port, change);
                Vec::new()
            }
            Event::LinkDiscovered(link) => {
                self.on_link(link, true);
                Vec::new()
            }
            Event::LinkRemoved(link) => {
                self.on_link(link, false);
                Vec::new()
            }
            Event::HostDiscovered { address, ipv4, at } => {
                self.on_host(address, ipv4, at);
                Vec::new()
            }
        }
    }

    fn on_features(&self, switch: SwitchId, ports: Vec<PortNo>, now: Instant) -> Vec<Command> {
        let mut registry = self.registry.write();
        registry.register(switch);

        let activated = match registry.activate(switch) {
            Ok(activated) => activated,
            Err(error) => {
                warn!(%error, "ignoring feature negotiation");
                return Vec::new();
            }
        };
        for port in ports {
            registry.add_port(switch, port);
        }

        if activated {
            info!(%switch, "datapath active");
            self.rebuild(&registry);
        }
        drop(registry);

        vec![self.install(switch, FlowRule::table_miss(), now)]
    }

    /// Remove `switch` and everything derived from it.
    ///
    /// Its forwarding entries, host attachments, counters and deltas, links
    /// and installed rules are purged, and an outstanding statistics
    /// request is cancelled so a late reply will be discarded. Returns
    /// `false` if the switch was not registered.
    pub fn unregister(&self, switch: SwitchId) -> bool {
        let mut registry = self.registry.write();
        self.unregister_locked(&mut registry, switch)
    }

    fn unregister_locked(&self, registry: &mut SwitchRegistry, switch: SwitchId) -> bool {
        let Some(instance) = registry.unregister(switch) else {
            debug!(%switch, "disconnect of an unknown datapath");
            return false;
        };

        let forwarding = self.forwarding.lock().remove_switch(switch);
        let hosts = self.hosts.write().remove_switch(switch);
        self.monitor.lock().forget(switch);
        let links = self.links.write().remove_switch(switch);
        self.flood_guard.lock().remove_switch(switch);
        let rules = self.flows.lock().remove_switch(switch);

        debug!(
            %switch,
            state = %instance.state(),
            forwarding,
            hosts,
            links,
            rules,
            "purged datapath state"
        );

        self.rebuild(registry);
        true
    }

    /// Issue a statistics request to every active switch.
    ///
    /// Expired forwarding entries and idle flow rules are swept on the
    /// way.
    pub fn poll(&self, now: Instant) -> Vec<Command> {
        let registry = self.registry.read();

        let expired = self.forwarding.lock().expire(now);
        if expired > 0 {
            debug!(expired, "forwarding entries aged out");
        }
        let idle = self.flows.lock().expire(now);
        if idle > 0 {
            debug!(idle, "idle flow rules forgotten");
        }

        let switches = registry.list();
        let mut monitor = self.monitor.lock();
        switches
            .into_iter()
            .map(|switch| Command::RequestPortStats {
                switch,
                request: monitor.request(switch, now),
            })
            .collect()
    }

    /// Feed a statistics reply, rebuilding the topology when new deltas
    /// were computed.
    pub fn on_port_stats(
        &self,
        switch: SwitchId,
        request: RequestId,
        entries: Vec<PortStatsEntry>,
        now: Instant,
    ) -> Ingest {
        let registry = self.registry.read();
        if !registry.is_active(switch) {
            debug!(%switch, "discarding statistics of an inactive datapath");
            return Ingest::Discarded;
        }

        let ingest = self.monitor.lock().ingest(switch, request, entries, now);
        if let Ingest::Deltas(ports) = ingest {
            trace!(%switch, ports, "deltas updated");
            self.rebuild(&registry);
        }
        ingest
    }

    fn on_port_status(&self, switch: SwitchId, port: PortNo, change: PortChange) {
        let mut registry = self.registry.write();
        if !registry.contains(switch) {
            return;
        }

        match change {
            PortChange::Added | PortChange::Modified => registry.add_port(switch, port),
            PortChange::Deleted => {
                registry.remove_port(switch, port);
                self.forwarding.lock().remove_port(switch, port);
                self.hosts.write().remove_port(switch, port);
                self.monitor.lock().forget_port(switch, port);
                let links = self.links.write().remove_port(switch, port);

                debug!(%switch, %port, links, "port deleted");
                self.rebuild(&registry);
            }
        }
    }

    fn on_link(&self, link: Link, discovered: bool) {
        let registry = self.registry.read();

        if discovered {
            // hosts are never attached behind an inter-switch link
            {
                let mut hosts = self.hosts.write();
                hosts.remove_port(link.src.switch, link.src.port);
                hosts.remove_port(link.dst.switch, link.dst.port);
            }
            if !self.links.write().insert(link) {
                return;
            }
            debug!(%link, "link discovered");
        } else {
            // no forwarding entry points into a removed link
            {
                let mut forwarding = self.forwarding.lock();
                forwarding.remove_port(link.src.switch, link.src.port);
                forwarding.remove_port(link.dst.switch, link.dst.port);
            }
            if !self.links.write().remove(&link) {
                return;
            }
            debug!(%link, "link removed");
        }

        self.rebuild(&registry);
    }

    fn on_host(&self, address: MacAddr, ipv4: Option<Ipv4Addr>, at: LinkEnd) {
        let registry = self.registry.read();
        if !registry.contains(at.switch) {
            debug!(%address, %at, "host discovered on an unknown datapath");
            return;
        }

        let mut hosts = self.hosts.write();
        if let Some(ip) = ipv4 {
            hosts.bind(ip, address);
        }
        if self.links.read().is_link_port(at.switch, at.port) {
            debug!(%address, %at, "ignoring host attachment on a link port");
            return;
        }
        hosts.attach(address, at);
    }

    /// A command sent to `switch` failed.
    ///
    /// Once the configured number of consecutive failures is reached the
    /// switch is unregistered and a [`Command::Disconnect`] returned.
    pub fn report_failure(&self, switch: SwitchId) -> Option<Command> {
        let mut registry = self.registry.write();
        let failures = registry.record_failure(switch)?;

        if failures < self.config.max_command_failures() {
            warn!(%switch, failures, "south-bound command failed");
            return None;
        }

        warn!(%switch, failures, "too many failed commands, disconnecting datapath");
        self.unregister_locked(&mut registry, switch);
        Some(Command::Disconnect { switch })
    }

    pub fn report_success(&self, switch: SwitchId) {
        self.registry.write().clear_failures(switch);
    }

    /// Record `rule` in the ledger and wrap it in a command.
    fn install(&self, switch: SwitchId, rule: FlowRule, now: Instant) -> Command {
        match self.flows.lock().record(switch, rule.clone(), now) {
            Recorded::New | Recorded::Replaced => info!(
                %switch,
                priority = rule.priority,
                output = %rule.output,
                "install flow rule"
            ),
            Recorded::Unchanged => debug!(%switch, priority = rule.priority, "reinstall flow rule"),
        }
        Command::InstallFlowRule { switch, rule }
    }

    /// Build and publish a new graph from the active switches, the links
    /// and the latest deltas.
    ///
    /// The monitor stays locked until the graph is published so two
    /// concurrent rebuilds cannot publish out of order.
    fn rebuild(&self, registry: &SwitchRegistry) {
        let monitor = self.monitor.lock();
        let links = self.links.read();

        let graph = TopologyGraph::build(
            registry.list(),
            &links,
            self.config.missing_weight(),
            |end| monitor.delta(end.switch, end.port),
        );
        let edges = graph.edge_count();
        let generation = self.graph.publish(graph);
        trace!(generation, edges, "topology published");
    }

    /// the current topology snapshot
    pub fn topology(&self) -> Arc<TopologyGraph> {
        self.graph.load()
    }

    pub fn active_switches(&self) -> Vec<SwitchId> {
        self.registry.read().list()
    }

    pub fn is_registered(&self, switch: SwitchId) -> bool {
        self.registry.read().contains(switch)
    }

    pub fn stats(&self) -> ControlPlaneStats {
        let registry = self.registry.read();
        let forwarding = self.forwarding.lock();
        let hosts = self.hosts.read();
        let monitor = self.monitor.lock();
        let links = self.links.read();
        let flows = self.flows.lock();
        let graph = self.graph.load();

        let switches = registry
            .iter()
            .map(|switch| SwitchStats {
                id: switch.id(),
                state: switch.state(),
                ports: switch.ports().collect(),
                forwarding_entries: forwarding.len(switch.id()),
                flow_rules: flows.count(switch.id()),
                failures: switch.failures(),
                deltas: monitor.deltas(switch.id()).cloned().unwrap_or_default(),
            })
            .collect();

        let links = links
            .iter()
            .map(|link| LinkStats {
                link: *link,
                delta: monitor.delta(link.src.switch, link.src.port),
                in_graph: graph
                    .edge(link.src.switch, link.dst.switch)
                    .is_some_and(|edge| edge.port == link.src.port),
            })
            .collect();

        ControlPlaneStats {
            switches,
            links,
            hosts: hosts.len(),
            generation: graph.generation(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{fixture::*, *};
    use crate::{event::PacketData, flow::BufferId};

    // ---- 1. lifecycle ----

    #[test]
    fn features_install_table_miss() {
        let now = Instant::now();
        let plane = ControlPlane::new(Config::default());

        assert!(plane.handle(Event::SwitchConnected { switch: S1 }, now).is_empty());
        assert!(plane.active_switches().is_empty());

        let commands = plane.handle(
            Event::FeaturesReply {
                switch: S1,
                ports: vec![p(1), p(2), PortNo::LOCAL],
            },
            now,
        );
        assert_eq!(
            commands,
            vec![Command::InstallFlowRule {
                switch: S1,
                rule: FlowRule::table_miss()
            }]
        );
        assert_eq!(plane.active_switches(), vec![S1]);
        assert!(plane.topology().contains(S1));

        let stats = plane.stats();
        assert_eq!(stats.switches[0].ports, vec![p(1), p(2)]);
        assert_eq!(stats.switches[0].flow_rules, 1);
    }

    #[test]
    fn duplicate_connect_keeps_instance() {
        let now = Instant::now();
        let plane = ControlPlane::new(Config::default());
        connect(&plane, S1, 2, now);

        plane.handle(Event::SwitchConnected { switch: S1 }, now);
        assert_eq!(
            plane.active_switches(),
            vec![S1],
            "a duplicate registration must not reset the switch"
        );
    }

    #[test]
    fn unregister_purges_everything() {
        let now = Instant::now();
        let plane = linear(Config::default(), now);
        packet_in(&plane, S1, 1, icmp(A, B), now);
        packet_in(&plane, S3, 1, icmp(B, A), now);
        assert_eq!(plane.forwarding.lock().len(S3), 1);

        // a statistics request is in flight when S3 goes away
        let polled = plane.poll(now);
        assert_eq!(polled.len(), 3);
        let stale = request_for(&polled, S3);

        plane.handle(Event::SwitchDisconnected { switch: S3 }, now);

        assert!(!plane.is_registered(S3));
        assert_eq!(plane.forwarding.lock().len(S3), 0);
        assert_eq!(plane.hosts.read().locate(B), None);
        assert_eq!(plane.flows.lock().count(S3), 0);
        assert!(!plane.links.read().iter().any(|link| link.touches(S3)));
        assert!(!plane.topology().contains(S3));
        assert_eq!(plane.topology().edge_count(), 2);

        let polled: Vec<_> = plane.poll(now).iter().map(Command::switch).collect();
        assert_eq!(polled, vec![S1, S2]);

        // the same switch reconnects: the reply to the cancelled request
        // must not be taken as an answer to a new one
        connect(&plane, S3, 4, now);
        assert_eq!(
            plane.on_port_stats(S3, stale, vec![PortStatsEntry::bytes(1, 10, 10)], now),
            Ingest::Discarded
        );

        let fresh = request_for(&plane.poll(now), S3);
        assert_eq!(
            plane.on_port_stats(S3, stale, vec![PortStatsEntry::bytes(1, 10, 10)], now),
            Ingest::Discarded,
            "a reply still queued from the previous connection"
        );
        assert_eq!(
            plane.on_port_stats(S3, fresh, vec![PortStatsEntry::bytes(1, 20, 20)], now),
            Ingest::Baseline
        );
    }

    #[test]
    fn unregister_unknown_switch() {
        let plane = ControlPlane::new(Config::default());
        assert!(!plane.unregister(S1));
    }

    #[test]
    fn deleted_port_is_purged() {
        let now = Instant::now();
        let plane = linear(Config::default(), now);
        packet_in(&plane, S1, 1, icmp(A, B), now);
        assert!(plane.hosts.read().locate(A).is_some());

        plane.handle(
            Event::PortStatus {
                switch: S1,
                port: p(1),
                change: PortChange::Deleted,
            },
            now,
        );
        assert_eq!(plane.hosts.read().locate(A), None);
        assert_eq!(plane.forwarding.lock().len(S1), 0);

        plane.handle(
            Event::PortStatus {
                switch: S1,
                port: p(2),
                change: PortChange::Deleted,
            },
            now,
        );
        assert!(plane.topology().edge(S1, S2).is_none());
        assert!(
            plane.topology().edge(S2, S1).is_none(),
            "both directions of the cable are gone"
        );
    }

    // ---- 2. statistics ----

    #[test]
    fn poll_only_active_switches() {
        let now = Instant::now();
        let plane = ControlPlane::new(Config::default());
        connect(&plane, S1, 2, now);
        plane.handle(Event::SwitchConnected { switch: S2 }, now);

        let polled: Vec<_> = plane.poll(now).iter().map(Command::switch).collect();
        assert_eq!(polled, vec![S1]);
    }

    #[test]
    fn deltas_weigh_the_topology() {
        let now = Instant::now();
        let plane = linear(Config::default(), now);
        let generation = plane.topology().generation();

        let request = request_for(&plane.poll(now), S1);
        assert_eq!(
            plane.on_port_stats(S1, request, vec![PortStatsEntry::bytes(2, 100, 100)], now),
            Ingest::Baseline
        );
        assert_eq!(plane.topology().generation(), generation, "baseline only");

        let request = request_for(&plane.poll(now), S1);
        assert_eq!(
            plane.on_port_stats(S1, request, vec![PortStatsEntry::bytes(2, 400, 200)], now),
            Ingest::Deltas(1)
        );

        let topology = plane.topology();
        assert!(topology.generation() > generation);
        let edge = topology.edge(S1, S2).unwrap();
        assert_eq!(edge.weight, 400);
        assert!(edge.measured);

        let stats = plane.stats();
        let link = stats
            .links
            .iter()
            .find(|link| link.link.src == LinkEnd::new(S1, p(2)))
            .unwrap();
        assert_eq!(link.delta, Some(400));
        assert!(link.in_graph);
    }

    #[test]
    fn unsolicited_reply_is_discarded() {
        let now = Instant::now();
        let plane = linear(Config::default(), now);

        assert_eq!(
            plane.on_port_stats(S1, RequestId::new(0), vec![PortStatsEntry::bytes(2, 1, 1)], now),
            Ingest::Discarded
        );
        assert_eq!(
            plane.on_port_stats(S4, RequestId::new(0), vec![PortStatsEntry::bytes(2, 1, 1)], now),
            Ingest::Discarded
        );
    }

    // ---- 3. topology and hosts ----

    #[test]
    fn link_discovery_clears_host_attachment() {
        let now = Instant::now();
        let plane = ControlPlane::new(Config::default());
        connect(&plane, S1, 4, now);
        connect(&plane, S2, 4, now);

        // traffic from a neighbour switch seen before discovery
        packet_in(&plane, S1, 2, icmp(B, A), now);
        assert_eq!(plane.hosts.read().locate(B), Some(LinkEnd::new(S1, p(2))));

        cable(&plane, (S1, 2), (S2, 1), now);
        assert_eq!(plane.hosts.read().locate(B), None);

        plane.handle(
            Event::HostDiscovered {
                address: B,
                ipv4: Some(IP_B),
                at: LinkEnd::new(S1, p(2)),
            },
            now,
        );
        assert_eq!(plane.hosts.read().locate(B), None, "not on a link port");
        assert_eq!(plane.hosts.read().resolve(IP_B), Some(B));
    }

    #[test]
    fn link_removal_rebuilds() {
        let now = Instant::now();
        let plane = linear(Config::default(), now);
        assert_eq!(plane.topology().edge_count(), 4);

        let link = Link::new((S1, p(2)), (S2, p(1)));
        plane.handle(Event::LinkRemoved(link), now);
        assert!(plane.topology().edge(S1, S2).is_none());
        assert!(plane.topology().edge(S2, S1).is_some());
    }

    // ---- 4. south-bound failures ----

    #[test]
    fn persistent_failures_disconnect() {
        let now = Instant::now();
        let plane = linear(
            Config::builder().max_command_failures(2).build().unwrap(),
            now,
        );

        assert_eq!(plane.report_failure(S2), None);
        plane.report_success(S2);
        assert_eq!(plane.report_failure(S2), None);
        assert_eq!(
            plane.report_failure(S2),
            Some(Command::Disconnect { switch: S2 })
        );
        assert!(!plane.is_registered(S2));
        assert_eq!(plane.report_failure(S2), None);
    }

    #[test]
    fn flood_releases_the_buffer() {
        let now = Instant::now();
        let plane = linear(Config::default(), now);

        let commands = plane.handle(
            Event::PacketIn {
                switch: S1,
                in_port: p(1),
                payload: icmp(A, B),
                buffer: Some(BufferId::new(9)),
            },
            now,
        );
        assert!(matches!(
            commands.as_slice(),
            [Command::PacketOut {
                data: PacketData::Buffered(_),
                in_port: Some(_),
                ..
            }]
        ));
    }
}
