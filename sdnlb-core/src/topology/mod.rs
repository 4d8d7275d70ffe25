//! Load-weighted view of the switch adjacency.
//!
//! A [`TopologyGraph`] is immutable once built. It is rebuilt as a whole
//! whenever the link set or the port deltas change and published through
//! a [`SnapshotCell`]: readers hold an `Arc` to one consistent graph for
//! the duration of their computation while the writer swaps in the next
//! one.

mod path;

pub use self::path::{Path, PathError};
use crate::{
    link::{LinkEnd, LinkSet},
    port::PortNo,
    switch::SwitchId,
};
use anyhow::bail;
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
    sync::Arc,
};

/// What weight a link gets when its egress port has no delta yet (fewer
/// than two statistics samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MissingWeight {
    /// the link is usable and costs nothing: freshly discovered links can
    /// carry traffic before the first statistics cycle completes
    #[default]
    Zero,
    /// the link is left out of the graph until it has been measured
    Unusable,
}

impl fmt::Display for MissingWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => f.write_str("zero"),
            Self::Unusable => f.write_str("unusable"),
        }
    }
}

impl FromStr for MissingWeight {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(Self::Zero),
            "unusable" | "infinite" => Ok(Self::Unusable),
            _ => bail!("Unknown missing weight policy `{s}', expecting `zero' or `unusable'"),
        }
    }
}

/// A directed edge of the [`TopologyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// egress port on the source switch
    pub port: PortNo,
    /// ingress port on the destination switch
    pub peer_port: PortNo,
    /// latest delta of the egress port (or the fallback)
    pub weight: u64,
    /// `false` when the weight comes from the [`MissingWeight`] fallback
    pub measured: bool,
}

/// Directed, weighted graph of switch adjacency.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    generation: u64,
    nodes: BTreeSet<SwitchId>,
    adjacency: BTreeMap<SwitchId, BTreeMap<SwitchId, Edge>>,
}

impl TopologyGraph {
    /// Build a graph from the discovered `links`.
    ///
    /// Only links whose both ends are in `nodes` are considered. The weight
    /// of each link is looked up on its source end through `delta`; links
    /// without a delta are handled according to `missing`. When several
    /// links join the same two switches, the lightest one (then the lowest
    /// egress port) is kept.
    pub fn build<F>(
        nodes: impl IntoIterator<Item = SwitchId>,
        links: &LinkSet,
        missing: MissingWeight,
        mut delta: F,
    ) -> Self
    where
        F: FnMut(LinkEnd) -> Option<u64>,
    {
        let nodes: BTreeSet<SwitchId> = nodes.into_iter().collect();
        let mut adjacency: BTreeMap<SwitchId, BTreeMap<SwitchId, Edge>> = BTreeMap::new();

        for link in links.iter() {
            if !nodes.contains(&link.src.switch) || !nodes.contains(&link.dst.switch) {
                continue;
            }
            if link.src.switch == link.dst.switch {
                continue;
            }

            let edge = match (delta(link.src), missing) {
                (Some(weight), _) => Edge {
                    port: link.src.port,
                    peer_port: link.dst.port,
                    weight,
                    measured: true,
                },
                (None, MissingWeight::Zero) => Edge {
                    port: link.src.port,
                    peer_port: link.dst.port,
                    weight: 0,
                    measured: false,
                },
                (None, MissingWeight::Unusable) => continue,
            };

            adjacency
                .entry(link.src.switch)
                .or_default()
                .entry(link.dst.switch)
                .and_modify(|current| {
                    if (edge.weight, edge.port) < (current.weight, current.port) {
                        *current = edge;
                    }
                })
                .or_insert(edge);
        }

        Self {
            generation: 0,
            nodes,
            adjacency,
        }
    }

    /// Incremented every time a graph is published in a [`SnapshotCell`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, switch: SwitchId) -> bool {
        self.nodes.contains(&switch)
    }

    pub fn nodes(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.nodes.iter().copied()
    }

    /// Outgoing edges of `switch`, ordered by neighbour id.
    pub fn neighbours(&self, switch: SwitchId) -> impl Iterator<Item = (SwitchId, &Edge)> {
        self.adjacency
            .get(&switch)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(next, edge)| (*next, edge)))
    }

    pub fn edge(&self, from: SwitchId, to: SwitchId) -> Option<&Edge> {
        self.adjacency.get(&from)?.get(&to)
    }

    /// every edge as `(from, to, edge)`
    pub fn edges(&self) -> impl Iterator<Item = (SwitchId, SwitchId, &Edge)> {
        self.adjacency.iter().flat_map(|(from, edges)| {
            edges.iter().map(move |(to, edge)| (*from, *to, edge))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum()
    }
}

/// Holds the current [`TopologyGraph`] and swaps it atomically.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: RwLock<Arc<TopologyGraph>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph as of now. The returned snapshot never changes.
    pub fn load(&self) -> Arc<TopologyGraph> {
        Arc::clone(&self.current.read())
    }

    /// Replace the current graph, returning the generation assigned to it.
    pub fn publish(&self, mut graph: TopologyGraph) -> u64 {
        let mut current = self.current.write();
        graph.generation = current.generation.wrapping_add(1);
        let generation = graph.generation;
        *current = Arc::new(graph);
        generation
    }
}
