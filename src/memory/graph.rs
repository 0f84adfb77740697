//! Directed, typed relationship graph over node ids.
//!
//! Edges are owned by the graph and looked up by id; nodes never hold
//! references to each other, so cycles need no special handling.

use crate::memory::types::{EdgeType, MemoryEdge, NodeId};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
struct Adjacency {
    outgoing: Vec<MemoryEdge>,
    /// Distinct sources with at least one edge into this node
    incoming: BTreeSet<NodeId>,
}

/// Adjacency-list graph. Multiple typed edges may join the same pair.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    nodes: HashMap<NodeId, Adjacency>,
    edge_count: usize,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Add a node. Adding an existing node is a no-op.
    pub fn add_node(&mut self, id: NodeId) {
        self.nodes.entry(id).or_default();
    }

    /// Add an edge between two known nodes. Returns false if either endpoint
    /// is unknown.
    pub fn add_edge(&mut self, edge: MemoryEdge) -> bool {
        if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
            return false;
        }

        if let Some(target) = self.nodes.get_mut(&edge.target) {
            target.incoming.insert(edge.source.clone());
        }
        if let Some(source) = self.nodes.get_mut(&edge.source) {
            source.outgoing.push(edge);
        }
        self.edge_count += 1;
        true
    }

    /// Convenience wrapper around [`add_edge`](Self::add_edge).
    pub fn link(&mut self, source: &NodeId, target: &NodeId, edge_type: EdgeType, strength: f64) -> bool {
        self.add_edge(MemoryEdge::new(
            source.clone(),
            target.clone(),
            edge_type,
            strength,
        ))
    }

    /// Remove a node and every edge touching it. Returns the number of edges
    /// removed, or `None` if the node was unknown.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<usize> {
        let adjacency = self.nodes.remove(id)?;
        let mut removed = 0;

        for edge in &adjacency.outgoing {
            removed += 1;
            if let Some(target) = self.nodes.get_mut(&edge.target) {
                target.incoming.remove(id);
            }
        }

        for source in &adjacency.incoming {
            if source == id {
                continue;
            }
            if let Some(source) = self.nodes.get_mut(source) {
                let before = source.outgoing.len();
                source.outgoing.retain(|e| &e.target != id);
                removed += before - source.outgoing.len();
            }
        }

        self.edge_count -= removed;
        Some(removed)
    }

    /// Distinct nodes with an edge into `id`, in id order.
    pub fn predecessors(&self, id: &NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|adj| adj.incoming.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Distinct nodes `id` has an edge into, in id order.
    pub fn successors(&self, id: &NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|adj| {
                adj.outgoing
                    .iter()
                    .map(|e| e.target.clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Predecessors followed by successors, without duplicates.
    pub fn neighbors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut seen = BTreeSet::new();
        self.predecessors(id)
            .into_iter()
            .chain(self.successors(id))
            .filter(|n| seen.insert(n.clone()))
            .collect()
    }

    /// Outgoing edges of `id`.
    pub fn edges_from(&self, id: &NodeId) -> &[MemoryEdge] {
        self.nodes
            .get(id)
            .map(|adj| adj.outgoing.as_slice())
            .unwrap_or(&[])
    }

    /// Every edge in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &MemoryEdge> {
        self.nodes.values().flat_map(|adj| adj.outgoing.iter())
    }

    /// In-degree plus out-degree, counting parallel edges.
    pub fn degree(&self, id: &NodeId) -> usize {
        let Some(adj) = self.nodes.get(id) else {
            return 0;
        };
        let incoming: usize = adj
            .incoming
            .iter()
            .filter_map(|src| self.nodes.get(src))
            .map(|src| src.outgoing.iter().filter(|e| &e.target == id).count())
            .sum();
        adj.outgoing.len() + incoming
    }

    /// Number of distinct ordered (source, target) pairs joined by an edge.
    pub fn connected_pairs(&self) -> usize {
        self.nodes.values().map(|adj| {
            adj.outgoing
                .iter()
                .map(|e| &e.target)
                .collect::<BTreeSet<_>>()
                .len()
        })
        .sum()
    }

    /// Share of possible ordered pairs that are connected.
    pub fn density(&self) -> f64 {
        let n = self.nodes.len();
        if n < 2 {
            return 0.0;
        }
        self.connected_pairs() as f64 / (n * (n - 1)) as f64
    }
}
