use super::TopologyGraph;
use crate::{port::PortNo, switch::SwitchId};
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};
use thiserror::Error;

/// A minimum-weight path between two switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    hops: Vec<SwitchId>,
    egress: PortNo,
    cost: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Switch ({switch}) is not part of the topology")]
    UnknownSwitch { switch: SwitchId },
    #[error("Source and destination are the same switch ({switch})")]
    SameSwitch { switch: SwitchId },
    #[error("No path from {src} to {dst}")]
    NotFound { src: SwitchId, dst: SwitchId },
}

impl Path {
    /// every switch on the path, source and destination included
    pub fn hops(&self) -> &[SwitchId] {
        &self.hops
    }

    /// the port the source switch must output on
    pub fn egress_port(&self) -> PortNo {
        self.egress
    }

    pub fn next_hop(&self) -> SwitchId {
        self.hops[1]
    }

    /// sum of the edge weights along the path
    pub fn cost(&self) -> u64 {
        self.cost
    }
}

impl TopologyGraph {
    /// Minimum-weight path from `src` to `dst` (Dijkstra).
    ///
    /// Among paths of equal cost the one whose sequence of switch ids is
    /// lexicographically smallest wins, so the lowest next hop id is
    /// preferred and identical graphs always yield identical paths.
    pub fn shortest_path(&self, src: SwitchId, dst: SwitchId) -> Result<Path, PathError> {
        if !self.contains(src) {
            return Err(PathError::UnknownSwitch { switch: src });
        }
        if !self.contains(dst) {
            return Err(PathError::UnknownSwitch { switch: dst });
        }
        if src == dst {
            return Err(PathError::SameSwitch { switch: src });
        }

        let mut best: HashMap<SwitchId, (u64, Vec<SwitchId>)> = HashMap::new();
        let mut queue = BinaryHeap::new();

        best.insert(src, (0, vec![src]));
        queue.push(Reverse((0u64, vec![src])));

        while let Some(Reverse((cost, hops))) = queue.pop() {
            let Some(&node) = hops.last() else {
                continue;
            };

            // a better candidate for `node` was settled since this one was queued
            if best
                .get(&node)
                .is_some_and(|(best_cost, best_hops)| (*best_cost, best_hops) < (cost, &hops))
            {
                continue;
            }

            if node == dst {
                let egress = self
                    .edge(hops[0], hops[1])
                    .map(|edge| edge.port)
                    .ok_or(PathError::NotFound { src, dst })?;
                return Ok(Path {
                    hops,
                    egress,
                    cost,
                });
            }

            for (next, edge) in self.neighbours(node) {
                if hops.contains(&next) {
                    continue;
                }

                let next_cost = cost.saturating_add(edge.weight);
                let mut next_hops = Vec::with_capacity(hops.len() + 1);
                next_hops.extend_from_slice(&hops);
                next_hops.push(next);

                let improves = match best.get(&next) {
                    None => true,
                    Some((best_cost, best_hops)) => {
                        (next_cost, &next_hops) < (*best_cost, best_hops)
                    }
                };
                if improves {
                    best.insert(next, (next_cost, next_hops.clone()));
                    queue.push(Reverse((next_cost, next_hops)));
                }
            }
        }

        Err(PathError::NotFound { src, dst })
    }
}
