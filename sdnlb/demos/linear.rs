//! Linear example: `S1-S2-S3` with a detour `S1-S4-S3`.
//!
//! Host A sits on S1, host B on S3. A small in-process fabric answers the
//! controller's statistics requests, loading S1's port toward S2 much
//! more than its port toward S4. Once a statistics cycle has measured it,
//! the A → B traffic is moved to the S4 route.
//!
//! Run with:
//!   cargo run --example linear -p sdnlb -- --poll-interval 200ms

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use rand::Rng as _;
use sdnlb::{
    Command, Config, Controller, Event, EventSender, HumanDuration, Link, LinkEnd, MacAddr,
    Output, PortNo, PortStatsEntry, RequestId, SwitchId, channel_southbound,
};
use std::{
    collections::HashMap,
    net::Ipv4Addr,
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Instant,
};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser)]
struct Args {
    /// interval between two statistics cycles
    #[arg(long, default_value = "200ms")]
    poll_interval: HumanDuration,

    /// bytes per cycle pushed through S1's port toward S2 (upper bound)
    #[arg(long, default_value = "1000000")]
    heavy: u64,

    /// bytes per cycle pushed through S1's port toward S4 (upper bound)
    #[arg(long, default_value = "1000")]
    light: u64,
}

const S1: SwitchId = SwitchId::new(1);
const S2: SwitchId = SwitchId::new(2);
const S3: SwitchId = SwitchId::new(3);
const S4: SwitchId = SwitchId::new(4);

const A: MacAddr = MacAddr::new([0, 0, 0, 0, 0, 0xa]);
const B: MacAddr = MacAddr::new([0, 0, 0, 0, 0, 0xb]);
const IP_A: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const IP_B: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

/// an ICMP echo request from `src` to `dst`
fn icmp(src: (MacAddr, Ipv4Addr), dst: (MacAddr, Ipv4Addr)) -> Vec<u8> {
    let mut frame = Vec::with_capacity(42);
    frame.extend_from_slice(&dst.0.octets());
    frame.extend_from_slice(&src.0.octets());
    frame.extend_from_slice(&0x0800u16.to_be_bytes());

    let mut ip = [0u8; 20];
    ip[0] = 0x45;
    ip[2..4].copy_from_slice(&28u16.to_be_bytes());
    ip[8] = 64;
    ip[9] = 1;
    ip[12..16].copy_from_slice(&src.1.octets());
    ip[16..20].copy_from_slice(&dst.1.octets());
    frame.extend_from_slice(&ip);
    frame.extend_from_slice(&[8, 0, 0, 0, 0, 1, 0, 1]);
    frame
}

fn packet_in(events: &EventSender, switch: SwitchId, port: u32, payload: Vec<u8>) -> Result<()> {
    events
        .send(Event::PacketIn {
            switch,
            in_port: PortNo::new(port),
            payload,
            buffer: None,
        })
        .context("Failed to deliver packet-in")
}

/// Plays the switches: answers statistics requests and reports the
/// forwarding decisions taken for S1.
struct Fabric {
    commands: Receiver<Command>,
    events: EventSender,
    counters: HashMap<(SwitchId, u32), u64>,
    heavy: u64,
    light: u64,
}

impl Fabric {
    /// Process commands until an A -> B rule on S1 shows up, returning
    /// its output port.
    fn next_decision(&mut self, deadline: Instant) -> Result<Option<PortNo>> {
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            let command = match self.commands.recv_timeout(timeout) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => bail!("controller went away"),
            };

            match command {
                Command::RequestPortStats { switch, request } => self.reply(switch, request)?,
                Command::InstallFlowRule { switch, rule }
                    if switch == S1 && rule.matcher.eth_dst == Some(B) =>
                {
                    if let Output::Port(port) = rule.output {
                        return Ok(Some(port));
                    }
                }
                _ => (),
            }
        }
    }

    fn reply(&mut self, switch: SwitchId, request: RequestId) -> Result<()> {
        let mut rng = rand::thread_rng();

        let entries = (1..=3)
            .map(|port| {
                let load = match (switch, port) {
                    (S1, 2) => rng.gen_range(self.heavy / 2..=self.heavy),
                    _ => rng.gen_range(0..=self.light),
                };
                let counter = self.counters.entry((switch, port)).or_default();
                *counter += load;
                PortStatsEntry::bytes(port, *counter, 0)
            })
            .collect();

        self.events
            .send(Event::PortStatsReply {
                switch,
                request,
                entries,
            })
            .context("Failed to deliver statistics")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let interval = args.poll_interval.into_duration();

    let config = Config::builder().poll_interval(interval).build()?;
    let (southbound, commands) = channel_southbound(1_024);
    let controller = Controller::new(config, southbound)?;
    let events = controller.events();

    for switch in [S1, S2, S3, S4] {
        events.send(Event::SwitchConnected { switch })?;
        events.send(Event::FeaturesReply {
            switch,
            ports: (1..=3).map(PortNo::new).collect(),
        })?;
    }
    for (a, b) in [((S1, 2), (S2, 1)), ((S2, 2), (S3, 2)), ((S1, 3), (S4, 1)), ((S4, 2), (S3, 3))] {
        let link = Link::new(LinkEnd::new(a.0, a.1), LinkEnd::new(b.0, b.1));
        events.send(Event::LinkDiscovered(link))?;
        events.send(Event::LinkDiscovered(link.reversed()))?;
    }

    let mut fabric = Fabric {
        commands,
        events: events.clone(),
        counters: HashMap::new(),
        heavy: args.heavy,
        light: args.light,
    };

    // A talks first: B is unknown and the packet is flooded, then B answers
    packet_in(&events, S1, 1, icmp((A, IP_A), (B, IP_B)))?;
    packet_in(&events, S3, 1, icmp((B, IP_B), (A, IP_A)))?;
    packet_in(&events, S1, 1, icmp((A, IP_A), (B, IP_B)))?;

    let deadline = Instant::now() + interval * 2;
    let Some(port) = fabric.next_decision(deadline)? else {
        bail!("no forwarding decision for A -> B");
    };
    println!("A -> B leaves S1 on port {port} (no load measured yet)");

    // let a few statistics cycles measure the load
    let measured = Instant::now() + interval * 4;
    while fabric.next_decision(measured)?.is_some() {}

    packet_in(&events, S1, 1, icmp((A, IP_A), (B, IP_B)))?;
    let deadline = Instant::now() + interval * 2;
    match fabric.next_decision(deadline)? {
        Some(port) => println!("A -> B leaves S1 on port {port} once S1 -> S2 is loaded"),
        None => println!("no new decision for A -> B"),
    }

    for link in controller.stats().plane.links {
        println!(
            "{:<32} delta {:>10}",
            link.link.to_string(),
            link.delta.map_or_else(|| "-".to_owned(), |delta| delta.to_string()),
        );
    }

    controller.shutdown()
}
