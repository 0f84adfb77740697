//! The neural graph memory facade.

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::memory::encoder::{FeatureEncoder, GraphEncoding};
use crate::memory::eviction::EvictionManager;
use crate::memory::graph::RelationshipGraph;
use crate::memory::index::VectorIndex;
use crate::memory::persist::{Snapshot, SNAPSHOT_VERSION};
use crate::memory::retrieval::{RetrievalEngine, RetrievalQuery, ScoredNode};
use crate::memory::store::MemoryStore;
use crate::memory::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Aggregate figures about a memory instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub modality_distribution: BTreeMap<Modality, usize>,
    pub avg_importance: f64,
    pub avg_valence: f64,
    pub graph_density: f64,
    pub avg_degree: f64,
}

/// Episodic memory over a node table, a relationship graph and a vector
/// index, kept consistent by this type.
///
/// Single writer: `insert`, `retrieve` (which bumps access counters),
/// `remove` and `load` take `&mut self`. Wrap in
/// [`SharedGraphMemory`](crate::memory::SharedGraphMemory) to share across
/// threads.
#[derive(Debug)]
pub struct NeuralGraphMemory {
    config: MemoryConfig,
    store: MemoryStore,
    graph: RelationshipGraph,
    index: VectorIndex,
    /// Index position -> node id. Never shrinks except on rebuild.
    positions: Vec<NodeId>,
    eviction: EvictionManager,
}

impl NeuralGraphMemory {
    /// Create an empty memory.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Initialized NGM with {}D embeddings, capacity {}",
            config.embedding_dim, config.capacity
        );

        Ok(Self {
            store: MemoryStore::new(config.embedding_dim),
            graph: RelationshipGraph::new(),
            index: VectorIndex::new(config.embedding_dim, &config.index)?,
            positions: Vec::new(),
            eviction: EvictionManager::new(config.decay_rate, config.eviction.clone()),
            config,
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.store.contains(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&MemoryNode> {
        self.store.get(id)
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Index positions that still map to a live node.
    pub fn live_positions(&self) -> usize {
        self.positions
            .iter()
            .filter(|id| self.store.contains(id))
            .count()
    }

    /// Every edge between live nodes.
    pub fn edges(&self) -> impl Iterator<Item = &MemoryEdge> {
        self.graph.edges()
    }

    /// Predecessors and successors of `id`; empty for unknown ids.
    pub fn neighbors(&self, id: &NodeId) -> Vec<NodeId> {
        self.graph.neighbors(id)
    }

    /// Store a new memory and return its id.
    ///
    /// Links causal edges from each known parent and temporal edges from the
    /// most recent nodes, indexes the embedding, then evicts if the store is
    /// over capacity. Invalid input fails before anything is mutated.
    pub fn insert(&mut self, input: MemoryInput) -> Result<NodeId> {
        self.insert_at(input, Utc::now())
    }

    /// [`insert`](Self::insert) with an explicit clock reading.
    pub fn insert_at(&mut self, mut input: MemoryInput, now: DateTime<Utc>) -> Result<NodeId> {
        input.validate(self.config.embedding_dim)?;
        let parents = std::mem::take(&mut input.parent_ids);
        let modality = input.modality;

        let id = self.store.create(input, now)?;
        self.link_new_node(&id, &parents);

        if let Err(e) = self.index_node(&id) {
            self.graph.remove_node(&id);
            if self.store.remove(&id).is_none() {
                return Err(Error::Inconsistency(format!(
                    "failed to roll back node {} after: {}",
                    id, e
                )));
            }
            return Err(e);
        }
        debug!(node_id = %id, %modality, "Added memory node");

        self.enforce_capacity(now);
        Ok(id)
    }

    fn link_new_node(&mut self, id: &NodeId, parents: &[NodeId]) {
        self.graph.add_node(id.clone());

        let mut linked = BTreeSet::new();
        for parent in parents {
            if !linked.insert(parent) {
                continue;
            }
            if self.store.contains(parent) && parent != id {
                self.graph
                    .link(parent, id, EdgeType::Causal, self.config.causal_strength);
            } else {
                warn!(parent = %parent, node_id = %id, "Skipping causal link to unknown parent");
            }
        }

        for recent in self.store.most_recent(self.config.temporal_lookback, id) {
            self.graph
                .link(&recent, id, EdgeType::Temporal, self.config.temporal_strength);
        }
    }

    fn index_node(&mut self, id: &NodeId) -> Result<()> {
        let node = self
            .store
            .get(id)
            .ok_or_else(|| Error::Internal(format!("node {} vanished during insert", id)))?;
        self.index.add(&node.embedding)?;
        self.positions.push(id.clone());
        Ok(())
    }

    /// Evict lowest-scoring nodes if over capacity. Returns the removed ids.
    pub fn enforce_capacity(&mut self, now: DateTime<Utc>) -> Vec<NodeId> {
        let victims = self
            .eviction
            .select_victims(&self.store, self.config.capacity, now);
        if victims.is_empty() {
            return victims;
        }

        for id in &victims {
            self.remove(id);
        }
        info!(
            "Pruned {} memories ({} policy), {} remain",
            victims.len(),
            self.config.eviction.policy,
            self.store.len()
        );
        victims
    }

    /// Delete a node and its edges. The index position is left stale.
    /// Returns false for unknown ids.
    pub fn remove(&mut self, id: &NodeId) -> bool {
        if self.store.remove(id).is_none() {
            return false;
        }
        self.graph.remove_node(id);
        true
    }

    /// Recall the memories most relevant to `query`, best first.
    ///
    /// Every returned node has its access count incremented; the returned
    /// records include that increment.
    pub fn retrieve(&mut self, query: &RetrievalQuery) -> Result<Vec<ScoredNode>> {
        let ranked = RetrievalEngine::new(
            &self.store,
            &self.graph,
            &self.index,
            &self.positions,
            &self.config.retrieval,
        )
        .rank(query)?;

        Ok(ranked
            .into_iter()
            .filter_map(|(id, score)| {
                self.store.record_access(&id);
                self.store.get(&id).map(|node| ScoredNode {
                    node: node.clone(),
                    score,
                })
            })
            .collect())
    }

    /// Nodes around `id` in creation order: up to `window_size / 2` before
    /// and after, plus the node itself. Empty for unknown ids.
    pub fn context_window(&self, id: &NodeId, window_size: usize) -> Vec<MemoryNode> {
        if !self.store.contains(id) {
            return Vec::new();
        }
        let ordered: Vec<&MemoryNode> = self.store.chronological().collect();
        let Some(center) = ordered.iter().position(|n| &n.id == id) else {
            return Vec::new();
        };

        let half = window_size / 2;
        let start = center.saturating_sub(half);
        let end = (center + half + 1).min(ordered.len());
        ordered[start..end].iter().map(|n| (*n).clone()).collect()
    }

    pub fn statistics(&self) -> MemoryStatistics {
        let total_nodes = self.store.len();
        let mut modality_distribution = BTreeMap::new();
        let mut importance_sum = 0.0;
        let mut valence_sum = 0.0;
        for node in self.store.chronological() {
            *modality_distribution.entry(node.modality).or_insert(0) += 1;
            importance_sum += node.importance;
            valence_sum += node.valence;
        }

        let mean = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };
        let total_edges = self.graph.edge_count();
        let degree_sum: usize = self
            .store
            .chronological()
            .map(|node| self.graph.degree(&node.id))
            .sum();

        MemoryStatistics {
            total_nodes,
            total_edges,
            modality_distribution,
            avg_importance: mean(importance_sum, total_nodes),
            avg_valence: mean(valence_sum, total_nodes),
            graph_density: self.graph.density(),
            avg_degree: mean(degree_sum as f64, total_nodes),
        }
    }

    /// Rebuild the vector index from live nodes only, reclaiming stale
    /// positions. Returns how many positions were dropped.
    pub fn rebuild_index(&mut self) -> Result<usize> {
        let mut index = VectorIndex::new(self.store.embedding_dim(), &self.config.index)?;
        let mut positions = Vec::with_capacity(self.store.len());
        for node in self.store.chronological() {
            index.add(&node.embedding)?;
            positions.push(node.id.clone());
        }

        let reclaimed = self.positions.len().saturating_sub(positions.len());
        self.index = index;
        self.positions = positions;
        info!("Rebuilt vector index, reclaimed {} stale positions", reclaimed);
        Ok(reclaimed)
    }

    /// Feature rows and edge list for every live node.
    pub fn encode_graph(&self, now: DateTime<Utc>) -> Result<GraphEncoding> {
        let encoder = FeatureEncoder::new(self.config.embedding_dim)?;
        Ok(encoder.encode_graph(&self.store, &self.graph, now))
    }

    /// Write a snapshot document to `path` and the index blob beside it.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut edges: Vec<MemoryEdge> = self.graph.edges().cloned().collect();
        edges.sort_by(|a, b| {
            (&a.source, &a.target, a.edge_type).cmp(&(&b.source, &b.target, b.edge_type))
        });

        let mut snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            config: self.config.clone(),
            next_sequence: self.store.next_sequence(),
            nodes: self.store.chronological().cloned().collect(),
            edges,
            index_to_node_id: self.positions.clone(),
            index_checksum: String::new(),
        };
        snapshot.write(path.as_ref(), &self.index)?;

        info!(
            "Saved NGM ({} nodes, {} edges, {} index positions)",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            snapshot.index_to_node_id.len()
        );
        Ok(())
    }

    /// Replace all state with the snapshot at `path`.
    ///
    /// The snapshot must match this instance's embedding dimension; every
    /// other config value is taken from the snapshot. On error the current
    /// state is untouched.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let (snapshot, index) = Snapshot::read(path.as_ref(), self.config.embedding_dim)?;
        snapshot.config.validate()?;

        let mut store = MemoryStore::new(snapshot.config.embedding_dim);
        let mut graph = RelationshipGraph::new();
        for node in snapshot.nodes {
            graph.add_node(node.id.clone());
            store
                .restore(node)
                .map_err(|e| Error::persistence(format!("invalid node in snapshot: {}", e)))?;
        }
        store.reserve_sequence(snapshot.next_sequence);

        let indexed: HashSet<&NodeId> = snapshot.index_to_node_id.iter().collect();
        if let Some(node) = store.iter().find(|node| !indexed.contains(&node.id)) {
            return Err(Error::persistence(format!(
                "node {} has no index position",
                node.id
            )));
        }

        for edge in snapshot.edges {
            let description = format!("{} -> {}", edge.source, edge.target);
            if !graph.add_edge(edge) {
                return Err(Error::persistence(format!(
                    "edge {} references an unknown node",
                    description
                )));
            }
        }

        self.eviction =
            EvictionManager::new(snapshot.config.decay_rate, snapshot.config.eviction.clone());
        self.config = snapshot.config;
        self.store = store;
        self.graph = graph;
        self.index = index;
        self.positions = snapshot.index_to_node_id;

        info!("Loaded NGM ({} nodes)", self.store.len());
        Ok(())
    }
}
