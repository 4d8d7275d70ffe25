mod event;
mod stop;

pub use self::event::{DeliverError, EventSender};
use self::{
    event::{EventReceivers, event_channel},
    stop::Stop,
};
use crate::{
    southbound::{Southbound, SouthboundError},
    stats::{ControllerStats, Counters},
};
use anyhow::{Context as _, Result, bail};
use sdnlb_core::{Command, Config, ControlPlane, Event, Ingest};
use std::{
    sync::{
        Arc,
        mpsc::{Receiver, RecvTimeoutError},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{debug, trace, warn};

/// How long a thread waits for an event before checking the stop signal.
const IDLE_WAKEUP: Duration = Duration::from_millis(50);

/// Capacity of each event queue.
const EVENT_QUEUE_CAPACITY: usize = 16 * 1_024;

/// A running control plane.
///
/// Two threads share the [`ControlPlane`]: the dispatcher consumes the
/// switch events (packet-in, lifecycle, discovery) and the poller drives
/// the statistics cycles and processes the replies. Make sure to call
/// [`Controller::shutdown`] for a clean shutdown of both.
pub struct Controller {
    plane: Arc<ControlPlane>,

    events: EventSender,
    counters: Arc<Counters>,

    stop: Arc<Stop>,
    dispatcher: JoinHandle<Result<()>>,
    poller: JoinHandle<Result<()>>,
}

/// Sends commands south and reports failures back to the plane.
struct Outbound<S> {
    plane: Arc<ControlPlane>,
    southbound: Arc<S>,
    counters: Arc<Counters>,
}

struct Dispatcher<S> {
    outbound: Outbound<S>,
    events: Receiver<Event>,
    stop: Arc<Stop>,
}

struct Poller<S> {
    outbound: Outbound<S>,
    replies: Receiver<Event>,
    interval: Duration,
    stop: Arc<Stop>,
}

impl Controller {
    pub fn new<S>(config: Config, southbound: S) -> Result<Self>
    where
        S: Southbound,
    {
        let interval = config.poll_interval();
        let plane = Arc::new(ControlPlane::new(config));
        let southbound = Arc::new(southbound);
        let counters = Arc::new(Counters::default());
        let stop = Arc::new(Stop::new());

        let (events, EventReceivers { dispatch, stats }) =
            event_channel(EVENT_QUEUE_CAPACITY, Arc::clone(&counters));

        let outbound = || Outbound {
            plane: Arc::clone(&plane),
            southbound: Arc::clone(&southbound),
            counters: Arc::clone(&counters),
        };

        let dispatcher = Dispatcher {
            outbound: outbound(),
            events: dispatch,
            stop: Arc::clone(&stop),
        };
        let poller = Poller {
            outbound: outbound(),
            replies: stats,
            interval,
            stop: Arc::clone(&stop),
        };

        let dispatcher = thread::Builder::new()
            .name("sdnlb-dispatcher".to_owned())
            .spawn(move || dispatcher.run())
            .context("Failed to spawn the dispatcher thread")?;
        let poller = match thread::Builder::new()
            .name("sdnlb-poller".to_owned())
            .spawn(move || poller.run())
        {
            Ok(poller) => poller,
            Err(error) => {
                stop.toggle();
                let _ = dispatcher.join();
                return Err(error).context("Failed to spawn the poller thread");
            }
        };

        Ok(Self {
            plane,
            events,
            counters,
            stop,
            dispatcher,
            poller,
        })
    }

    /// a handle for the transport to deliver switch events
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn plane(&self) -> &Arc<ControlPlane> {
        &self.plane
    }

    pub fn stats(&self) -> ControllerStats {
        self.counters.snapshot(self.plane.stats())
    }

    pub fn shutdown(self) -> Result<()> {
        self.stop.toggle();

        let dispatcher = join(self.dispatcher, "Dispatcher");
        let poller = join(self.poller, "Poller");
        dispatcher.and(poller)
    }
}

fn join(thread: JoinHandle<Result<()>>, name: &str) -> Result<()> {
    match thread.join() {
        Err(join_error) => {
            bail!("{name} failed to clean shutdown: {join_error:?}")
        }
        Ok(Err(error)) => Err(error).with_context(|| format!("{name} failed with error")),
        Ok(Ok(())) => Ok(()),
    }
}

impl<S> Outbound<S>
where
    S: Southbound,
{
    fn send_all(&self, commands: Vec<Command>) {
        for command in commands {
            self.send(command);
        }
    }

    fn send(&self, command: Command) {
        let switch = command.switch();
        let kind = command.kind();

        match self.southbound.send(command) {
            Ok(()) => {
                self.counters.command_sent();
                self.plane.report_success(switch);
            }
            // shared queue backlog, not a failure of the switch
            Err(error @ SouthboundError::Full { .. }) => {
                self.counters.command_failed();
                warn!(%switch, kind, %error, "south-bound queue full, command dropped");
            }
            Err(error) => {
                self.counters.command_failed();
                warn!(%switch, kind, %error, "south-bound command failed");

                if let Some(disconnect) = self.plane.report_failure(switch) {
                    match self.southbound.send(disconnect) {
                        Ok(()) => self.counters.command_sent(),
                        Err(error) => {
                            self.counters.command_failed();
                            debug!(%switch, %error, "disconnect not delivered");
                        }
                    }
                }
            }
        }
    }
}

impl<S> Dispatcher<S>
where
    S: Southbound,
{
    fn run(self) -> Result<()> {
        while !self.stop.get() {
            match self.events.recv_timeout(IDLE_WAKEUP) {
                Ok(event) => {
                    let commands = self.outbound.plane.handle(event, Instant::now());
                    self.outbound.send_all(commands);
                }
                Err(RecvTimeoutError::Timeout) => (),
                // every sender is gone, nothing will come anymore
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(())
    }
}

impl<S> Poller<S>
where
    S: Southbound,
{
    fn run(self) -> Result<()> {
        let mut next_cycle = Instant::now() + self.interval;

        while !self.stop.get() {
            let now = Instant::now();
            if now >= next_cycle {
                self.cycle(now);
                next_cycle = now + self.interval;
            }

            let timeout = next_cycle
                .saturating_duration_since(Instant::now())
                .min(IDLE_WAKEUP);
            match self.replies.recv_timeout(timeout) {
                Ok(Event::PortStatsReply {
                    switch,
                    request,
                    entries,
                }) => {
                    let ingest = self
                        .outbound
                        .plane
                        .on_port_stats(switch, request, entries, Instant::now());
                    if ingest == Ingest::Discarded {
                        debug!(%switch, "statistics reply discarded");
                    }
                }
                Ok(event) => {
                    // only statistics replies are routed here
                    let commands = self.outbound.plane.handle(event, Instant::now());
                    self.outbound.send_all(commands);
                }
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(())
    }

    fn cycle(&self, now: Instant) {
        let requests = self.outbound.plane.poll(now);
        trace!(switches = requests.len(), "statistics cycle");
        self.outbound.counters.poll_cycle();
        self.outbound.send_all(requests);
    }
}
