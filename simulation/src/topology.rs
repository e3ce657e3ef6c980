//! Live link state between simulated nodes
//!
//! Links are undirected. The table only records which pairs are currently
//! up; contact history lives in each node's router.

use std::collections::{BTreeMap, BTreeSet};

use ferry_core::HostId;

/// Adjacency of currently connected nodes
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    adjacency: BTreeMap<HostId, BTreeSet<HostId>>,
}

impl LinkTable {
    /// Create a table with no links
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the link between `a` and `b` up
    ///
    /// Returns false if it was already up or `a == b`.
    pub fn connect(&mut self, a: HostId, b: HostId) -> bool {
        if a == b {
            return false;
        }
        let added = self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        added
    }

    /// Take the link between `a` and `b` down
    ///
    /// Returns false if it was not up.
    pub fn disconnect(&mut self, a: HostId, b: HostId) -> bool {
        let removed = self.adjacency.get_mut(&a).is_some_and(|n| n.remove(&b));
        if let Some(neighbors) = self.adjacency.get_mut(&b) {
            neighbors.remove(&a);
        }
        removed
    }

    /// Check if `a` and `b` are connected
    pub fn are_connected(&self, a: HostId, b: HostId) -> bool {
        self.adjacency.get(&a).is_some_and(|n| n.contains(&b))
    }

    /// Current contacts of `node`, in id order
    pub fn neighbors(&self, node: HostId) -> Vec<HostId> {
        self.adjacency
            .get(&node)
            .map(|n| n.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of links currently up
    pub fn link_count(&self) -> usize {
        self.adjacency.values().map(|n| n.len()).sum::<usize>() / 2
    }

    /// Render the up links as `a <-> b` lines
    pub fn visualize(&self) -> String {
        let mut lines = Vec::new();
        for (a, neighbors) in &self.adjacency {
            for b in neighbors.iter().filter(|b| *b > a) {
                lines.push(format!("{} <-> {}", a, b));
            }
        }
        lines.join("\n")
    }
}
