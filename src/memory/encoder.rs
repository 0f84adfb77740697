//! Node feature encoding for structure-aware downstream models.
//!
//! Not used by retrieval. Each node becomes a fixed-length vector: the
//! leading part of its embedding followed by four scalar features.

use crate::error::{Error, Result};
use crate::memory::graph::RelationshipGraph;
use crate::memory::store::MemoryStore;
use crate::memory::types::{MemoryNode, NodeId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Number of scalar features appended after the embedding slice:
/// log-scaled age, normalized access count, valence, importance.
pub const SCALAR_FEATURES: usize = 4;

/// Access count that maps to a normalized value of 1.0.
const ACCESS_NORMALIZER: f32 = 100.0;

/// Encoded graph: one feature row per node plus edges as row-index pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEncoding {
    pub node_ids: Vec<NodeId>,
    pub features: Vec<Vec<f32>>,
    pub edge_index: Vec<(usize, usize)>,
}

/// Produces fixed-length feature vectors for nodes.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    target_dim: usize,
}

impl FeatureEncoder {
    pub fn new(target_dim: usize) -> Result<Self> {
        if target_dim < SCALAR_FEATURES {
            return Err(Error::Config(format!(
                "encoder dimension must be at least {}, got {}",
                SCALAR_FEATURES, target_dim
            )));
        }
        Ok(Self { target_dim })
    }

    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    /// Encode a single node as seen at `now`.
    pub fn encode_node(&self, node: &MemoryNode, now: DateTime<Utc>) -> Vec<f32> {
        let slice_len = self.target_dim - SCALAR_FEATURES;
        let mut encoded = Vec::with_capacity(self.target_dim);

        encoded.extend(node.embedding.iter().take(slice_len));
        encoded.resize(slice_len, 0.0);

        let age_seconds = (now - node.created_at).num_milliseconds().max(0) as f64 / 1000.0;
        encoded.push(age_seconds.ln_1p() as f32);
        encoded.push(node.access_count as f32 / ACCESS_NORMALIZER);
        encoded.push(node.valence as f32);
        encoded.push(node.importance as f32);
        encoded
    }

    /// Encode every live node in chronological order, with edges remapped to
    /// row indices. Parallel edges are kept.
    pub fn encode_graph(
        &self,
        store: &MemoryStore,
        graph: &RelationshipGraph,
        now: DateTime<Utc>,
    ) -> GraphEncoding {
        let node_ids: Vec<NodeId> = store.chronological().map(|n| n.id.clone()).collect();
        let features = store
            .chronological()
            .map(|n| self.encode_node(n, now))
            .collect();

        let row: HashMap<&NodeId, usize> =
            node_ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
        let mut edge_index: Vec<(usize, usize)> = graph
            .edges()
            .filter_map(|e| Some((*row.get(&e.source)?, *row.get(&e.target)?)))
            .collect();
        edge_index.sort_unstable();

        GraphEncoding {
            node_ids,
            features,
            edge_index,
        }
    }
}
