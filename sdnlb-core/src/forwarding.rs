use crate::{addr::MacAddr, port::PortNo, switch::SwitchId};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingEntry {
    pub port: PortNo,
    pub learned_at: Instant,
}

/// What [`ForwardingTable::learn`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Learned {
    New,
    Refreshed,
    /// the address was last seen on another port of the same switch
    Moved { from: PortNo },
}

/// Per-switch MAC learning table: source address → ingress port.
///
/// Learning is last-writer-wins. Entries are only valid for `ttl` after
/// they were last (re)learned; an expired entry is treated as unknown and
/// pruned on the next lookup or sweep.
#[derive(Debug)]
pub struct ForwardingTable {
    ttl: Duration,
    tables: HashMap<SwitchId, HashMap<MacAddr, ForwardingEntry>>,
}

impl ForwardingTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tables: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn learn(
        &mut self,
        switch: SwitchId,
        address: MacAddr,
        port: PortNo,
        now: Instant,
    ) -> Learned {
        let entry = ForwardingEntry {
            port,
            learned_at: now,
        };

        match self.tables.entry(switch).or_default().insert(address, entry) {
            None => Learned::New,
            Some(previous) if previous.port == port => Learned::Refreshed,
            Some(previous) => {
                debug!(
                    switch = %switch,
                    %address,
                    from = %previous.port,
                    to = %port,
                    "host moved"
                );
                Learned::Moved {
                    from: previous.port,
                }
            }
        }
    }

    pub fn lookup(&mut self, switch: SwitchId, address: MacAddr, now: Instant) -> Option<PortNo> {
        let ttl = self.ttl;
        let table = self.tables.get_mut(&switch)?;
        let entry = *table.get(&address)?;

        if expired(&entry, ttl, now) {
            table.remove(&address);
            return None;
        }

        Some(entry.port)
    }

    /// read-only lookup, ignoring (without pruning) expired entries
    pub fn peek(&self, switch: SwitchId, address: MacAddr, now: Instant) -> Option<PortNo> {
        let entry = self.tables.get(&switch)?.get(&address)?;
        (!expired(entry, self.ttl, now)).then_some(entry.port)
    }

    /// Remove every expired entry, returning how many were removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let mut removed = 0;
        for table in self.tables.values_mut() {
            let before = table.len();
            table.retain(|_, entry| !expired(entry, ttl, now));
            removed += before - table.len();
        }
        removed
    }

    pub fn remove_switch(&mut self, switch: SwitchId) -> usize {
        self.tables.remove(&switch).map_or(0, |table| table.len())
    }

    /// Forget every address learned on `(switch, port)`.
    pub fn remove_port(&mut self, switch: SwitchId, port: PortNo) -> usize {
        let Some(table) = self.tables.get_mut(&switch) else {
            return 0;
        };
        let before = table.len();
        table.retain(|_, entry| entry.port != port);
        before - table.len()
    }

    /// number of entries (expired ones included) held for `switch`
    pub fn len(&self, switch: SwitchId) -> usize {
        self.tables.get(&switch).map_or(0, HashMap::len)
    }
}

fn expired(entry: &ForwardingEntry, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(entry.learned_at) >= ttl
}
