//! Monitoring example: a ring of switches reporting random traffic.
//!
//! Every statistics request is answered with counters that grow by a
//! random amount; now and then a switch "reboots" and its counters start
//! over, which the controller clamps to a zero delta. The controller's
//! statistics are printed after every cycle.
//!
//! Run with:
//!   RUST_LOG=sdnlb_core=debug cargo run --example monitoring -p sdnlb -- --switches 6

use anyhow::{Result, bail, ensure};
use clap::Parser;
use rand::Rng as _;
use sdnlb::{
    Command, Config, Controller, Event, HumanDuration, Link, LinkEnd, PortNo, PortStatsEntry,
    SwitchId, channel_southbound,
};
use std::{
    collections::HashMap,
    sync::mpsc::RecvTimeoutError,
    time::Instant,
};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "4")]
    switches: u64,

    #[arg(long, default_value = "5")]
    cycles: u64,

    #[arg(long, default_value = "250ms")]
    poll_interval: HumanDuration,

    /// probability that a switch resets its counters on a reply
    #[arg(long, default_value = "0.05")]
    reset: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    ensure!(args.switches >= 2, "a ring needs at least 2 switches");
    ensure!((0.0..=1.0).contains(&args.reset), "--reset is a probability");

    let interval = args.poll_interval.into_duration();
    let config = Config::builder().poll_interval(interval).build()?;
    let (southbound, commands) = channel_southbound(1_024);
    let controller = Controller::new(config, southbound)?;
    let events = controller.events();

    // port 1 faces the previous switch of the ring, port 2 the next one
    let switches: Vec<SwitchId> = (1..=args.switches).map(SwitchId::new).collect();
    for switch in &switches {
        events.send(Event::SwitchConnected { switch: *switch })?;
        events.send(Event::FeaturesReply {
            switch: *switch,
            ports: vec![PortNo::new(1), PortNo::new(2)],
        })?;
    }
    for (index, switch) in switches.iter().enumerate() {
        let next = switches[(index + 1) % switches.len()];
        let link = Link::new(LinkEnd::new(*switch, 2), LinkEnd::new(next, 1));
        events.send(Event::LinkDiscovered(link))?;
        events.send(Event::LinkDiscovered(link.reversed()))?;
    }

    let mut rng = rand::thread_rng();
    let mut counters: HashMap<(SwitchId, u32), u64> = HashMap::new();
    let deadline = Instant::now() + interval * (args.cycles as u32 + 1);
    let mut printed = 0;

    while Instant::now() < deadline {
        let timeout = deadline.saturating_duration_since(Instant::now());
        let (switch, request) = match commands.recv_timeout(timeout) {
            Ok(Command::RequestPortStats { switch, request }) => (switch, request),
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => bail!("controller went away"),
        };

        let reset = rng.gen_bool(args.reset);
        let entries = [1, 2]
            .into_iter()
            .map(|port| {
                let counter = counters.entry((switch, port)).or_default();
                if reset {
                    *counter = 0;
                }
                *counter += rng.gen_range(0..100_000);
                PortStatsEntry::bytes(port, *counter, 0)
            })
            .collect();
        events.send(Event::PortStatsReply {
            switch,
            request,
            entries,
        })?;

        let stats = controller.stats();
        if stats.poll_cycles > printed {
            printed = stats.poll_cycles;
            println!(
                "cycle {printed}: {} events, {} commands, topology generation {}",
                stats.events_delivered, stats.commands_sent, stats.plane.generation
            );
            for switch in &stats.plane.switches {
                let deltas: Vec<String> = switch
                    .deltas
                    .iter()
                    .map(|(port, delta)| format!("{port}: {delta}"))
                    .collect();
                println!("  {} [{}]", switch.id, deltas.join(", "));
            }
        }
    }

    controller.shutdown()
}
