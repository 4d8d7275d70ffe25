mod id;

pub use self::id::SwitchId;
use crate::port::PortNo;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};
use thiserror::Error;
use tracing::{debug, info};

/// Lifecycle of one connection instance of a switch.
///
/// ```text
/// CONNECTING ──(features negotiated)──► ACTIVE
///      │                                  │
///      └──────────(I/O failure, teardown)─┴──► DISCONNECTED
/// ```
///
/// `Disconnected` is terminal: a reconnect of the same datapath creates a
/// brand new [`Switch`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Active,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("CONNECTING"),
            Self::Active => f.write_str("ACTIVE"),
            Self::Disconnected => f.write_str("DISCONNECTED"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Switch ({switch}) is not registered")]
    UnknownSwitch { switch: SwitchId },
    #[error("Switch ({switch}) cannot move from {from} to {to}")]
    InvalidTransition {
        switch: SwitchId,
        from: ConnectionState,
        to: ConnectionState,
    },
}

/// A connected forwarding element.
#[derive(Debug, Clone)]
pub struct Switch {
    id: SwitchId,
    state: ConnectionState,
    ports: BTreeSet<PortNo>,

    /// consecutive south-bound command failures
    failures: u32,
}

impl Switch {
    fn new(id: SwitchId) -> Self {
        Self {
            id,
            state: ConnectionState::Connecting,
            ports: BTreeSet::new(),
            failures: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> SwitchId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }

    pub fn ports(&self) -> impl Iterator<Item = PortNo> + '_ {
        self.ports.iter().copied()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn transition(&mut self, to: ConnectionState) -> Result<(), RegistryError> {
        use ConnectionState::*;

        match (self.state, to) {
            (Connecting, Active) | (Connecting | Active, Disconnected) => {
                self.state = to;
                Ok(())
            }
            (Active, Active) => Ok(()),
            (from, to) => Err(RegistryError::InvalidTransition {
                switch: self.id,
                from,
                to,
            }),
        }
    }
}

/// The set of switches currently known to the control plane.
///
/// The registry only ever holds live connection instances (`CONNECTING`
/// or `ACTIVE`): [`SwitchRegistry::unregister`] moves the instance to
/// `DISCONNECTED` and hands it back to the caller, which is responsible
/// for purging everything derived from it.
#[derive(Debug, Default)]
pub struct SwitchRegistry {
    switches: BTreeMap<SwitchId, Switch>,
}

impl SwitchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly connected switch in the `CONNECTING` state.
    ///
    /// Registration is idempotent: registering a switch that already has a
    /// live instance leaves that instance untouched and returns `false`.
    pub fn register(&mut self, id: SwitchId) -> bool {
        if self.switches.contains_key(&id) {
            debug!(switch = %id, "duplicate registration ignored");
            return false;
        }

        info!(switch = %id, "register datapath");
        self.switches.insert(id, Switch::new(id));
        true
    }

    /// Complete feature negotiation: `CONNECTING` → `ACTIVE`.
    ///
    /// Returns `true` if the switch was not active before.
    pub fn activate(&mut self, id: SwitchId) -> Result<bool, RegistryError> {
        let switch = self
            .switches
            .get_mut(&id)
            .ok_or(RegistryError::UnknownSwitch { switch: id })?;
        let was_active = switch.is_active();
        switch.transition(ConnectionState::Active)?;
        Ok(!was_active)
    }

    /// Remove the switch, returning its (now `DISCONNECTED`) instance.
    pub fn unregister(&mut self, id: SwitchId) -> Option<Switch> {
        let mut switch = self.switches.remove(&id)?;
        // CONNECTING and ACTIVE may both always disconnect
        let _ = switch.transition(ConnectionState::Disconnected);
        info!(switch = %id, "unregister datapath");
        Some(switch)
    }

    /// identifiers of all `ACTIVE` switches, in ascending order
    pub fn list(&self) -> Vec<SwitchId> {
        self.switches
            .values()
            .filter(|switch| switch.is_active())
            .map(Switch::id)
            .collect()
    }

    pub fn get(&self, id: SwitchId) -> Option<&Switch> {
        self.switches.get(&id)
    }

    pub fn contains(&self, id: SwitchId) -> bool {
        self.switches.contains_key(&id)
    }

    pub fn is_active(&self, id: SwitchId) -> bool {
        self.switches.get(&id).is_some_and(Switch::is_active)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Switch> {
        self.switches.values()
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    /// Record `port` as belonging to the switch. Non physical ports are
    /// ignored.
    pub fn add_port(&mut self, id: SwitchId, port: PortNo) {
        if let Some(switch) = self.switches.get_mut(&id)
            && port.is_physical()
        {
            switch.ports.insert(port);
        }
    }

    pub fn remove_port(&mut self, id: SwitchId, port: PortNo) -> bool {
        self.switches
            .get_mut(&id)
            .is_some_and(|switch| switch.ports.remove(&port))
    }

    /// Count one more consecutive command failure, returning the new count.
    pub fn record_failure(&mut self, id: SwitchId) -> Option<u32> {
        let switch = self.switches.get_mut(&id)?;
        switch.failures = switch.failures.saturating_add(1);
        Some(switch.failures)
    }

    pub fn clear_failures(&mut self, id: SwitchId) {
        if let Some(switch) = self.switches.get_mut(&id) {
            switch.failures = 0;
        }
    }
}
