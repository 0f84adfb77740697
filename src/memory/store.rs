//! In-memory node table.

use crate::error::{Error, Result};
use crate::memory::types::*;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Owns node records, id assignment, and validation.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    embedding_dim: usize,
    nodes: HashMap<NodeId, MemoryNode>,
    /// (created_at, sequence) -> id, for chronological scans
    chronology: BTreeMap<(DateTime<Utc>, u64), NodeId>,
    next_sequence: u64,
}

impl MemoryStore {
    /// Create an empty store for embeddings of the given length.
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            embedding_dim,
            nodes: HashMap::new(),
            chronology: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id)
    }

    /// Sequence number the next created node will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Validate input and create a node stamped at `now`.
    ///
    /// Nothing is mutated when validation fails. Parent ids on the input are
    /// ignored here; linking is the graph's concern.
    pub fn create(&mut self, input: MemoryInput, now: DateTime<Utc>) -> Result<NodeId> {
        input.validate(self.embedding_dim)?;

        let sequence = self.next_sequence;
        let id = NodeId::generate(now, sequence);
        let node = MemoryNode::new(id.clone(), sequence, now, input)?;

        self.next_sequence += 1;
        self.chronology.insert(node.chrono_key(), id.clone());
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Insert an already-built node, e.g. one restored from a snapshot.
    pub fn restore(&mut self, node: MemoryNode) -> Result<()> {
        if node.embedding.len() != self.embedding_dim {
            return Err(Error::dimension(self.embedding_dim, node.embedding.len()));
        }
        node.check()?;
        if self.nodes.contains_key(&node.id) {
            return Err(Error::persistence(format!("duplicate node id {}", node.id)));
        }
        if let Some(existing) = self.chronology.get(&node.chrono_key()) {
            return Err(Error::persistence(format!(
                "nodes {} and {} share creation time and sequence",
                existing, node.id
            )));
        }
        let following = node.sequence.checked_add(1).ok_or_else(|| {
            Error::persistence(format!("node {} has an exhausted sequence", node.id))
        })?;

        self.next_sequence = self.next_sequence.max(following);
        self.chronology.insert(node.chrono_key(), node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Raise the sequence counter so ids issued before a snapshot are never reused.
    pub fn reserve_sequence(&mut self, next: u64) {
        self.next_sequence = self.next_sequence.max(next);
    }

    /// Remove a node. Returns the removed record, or `None` if unknown.
    pub fn remove(&mut self, id: &NodeId) -> Option<MemoryNode> {
        let node = self.nodes.remove(id)?;
        self.chronology.remove(&node.chrono_key());
        Some(node)
    }

    /// Bump the access counter. Returns false for unknown ids.
    pub fn record_access(&mut self, id: &NodeId) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.access_count += 1;
                true
            }
            None => false,
        }
    }

    /// All nodes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryNode> {
        self.nodes.values()
    }

    /// All nodes, oldest first.
    pub fn chronological(&self) -> impl DoubleEndedIterator<Item = &MemoryNode> {
        self.chronology.values().filter_map(|id| self.nodes.get(id))
    }

    /// Up to `n` most recently created nodes other than `exclude`, newest first.
    pub fn most_recent(&self, n: usize, exclude: &NodeId) -> Vec<NodeId> {
        self.chronology
            .values()
            .rev()
            .filter(|id| *id != exclude)
            .take(n)
            .cloned()
            .collect()
    }
}
