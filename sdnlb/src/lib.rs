/*!
# SDN load balancer

Runtime of the load-aware control plane of [`sdnlb_core`]: a [`Controller`]
runs the packet dispatcher and the statistics poller on their own threads
and talks to the switches through a [`Southbound`] transport.

```no_run
use sdnlb::{Config, Controller, Event, SwitchId, channel_southbound};

# fn main() -> anyhow::Result<()> {
let (southbound, commands) = channel_southbound(1_024);
let controller = Controller::new(Config::default(), southbound)?;

let events = controller.events();
events.send(Event::SwitchConnected { switch: SwitchId::new(1) })?;

// the transport encodes and forwards these to the switch
let command = commands.recv()?;
# let _ = command;

controller.shutdown()
# }
```
*/

mod controller;
mod southbound;
pub mod stats;

// convenient re-export of `sdnlb_core` core objects
pub use sdnlb_core::{
    BufferId, Command, Config, ConfigBuilder, ConnectionState, ControlPlane, Event, FlowMatch,
    FlowRule, HumanDuration, Link, LinkEnd, MacAddr, MissingWeight, Output, PacketData,
    PortChange, PortCounters, PortNo, PortStatsEntry, RequestId, SwitchId, UnknownDestination,
};

pub use self::{
    controller::{Controller, DeliverError, EventSender},
    southbound::{ChannelSouthbound, Southbound, SouthboundError, channel_southbound},
    stats::ControllerStats,
};
