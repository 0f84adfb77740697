//! Ranked recall: vector search fused with importance and graph expansion.
//!
//! Ranking runs in three passes:
//!
//! 1. Over-fetch candidates from the vector index, drop stale positions and
//!    nodes failing the query filters. The request widens until `top_k`
//!    candidates survive or the whole index has been searched.
//! 2. Score each survivor as `similarity_weight * similarity +
//!    importance_weight * importance` and keep the best `top_k`.
//! 3. Optionally pull in graph predecessors and successors of the primary
//!    results at an attenuated score, then deduplicate (max score wins),
//!    re-sort and truncate to `top_k`.
//!
//! The engine only reads. Access counters are bumped by the caller on the
//! final result set.

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::memory::graph::RelationshipGraph;
use crate::memory::index::{distance_to_similarity, VectorIndex};
use crate::memory::store::MemoryStore;
use crate::memory::types::{MemoryNode, Modality, NodeId};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Parameters for a single recall.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalQuery {
    pub embedding: Vec<f32>,
    pub top_k: usize,
    /// Only return nodes of this modality
    pub modality: Option<Modality>,
    /// Only return nodes at or above this importance
    pub min_importance: f64,
    /// Expand primary results with their graph neighbours
    pub include_neighbors: bool,
}

impl RetrievalQuery {
    /// Query for the 5 best matches with neighbour expansion.
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            top_k: 5,
            modality: None,
            min_importance: 0.0,
            include_neighbors: true,
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn modality(mut self, modality: Modality) -> Self {
        self.modality = Some(modality);
        self
    }

    pub fn min_importance(mut self, min_importance: f64) -> Self {
        self.min_importance = min_importance;
        self
    }

    pub fn include_neighbors(mut self, include: bool) -> Self {
        self.include_neighbors = include;
        self
    }

    fn accepts(&self, node: &MemoryNode) -> bool {
        if let Some(modality) = self.modality {
            if node.modality != modality {
                return false;
            }
        }
        node.importance >= self.min_importance
    }
}

/// A recalled node with its ranking score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    pub node: MemoryNode,
    pub score: f64,
}

/// Read-only view over the three structures a recall needs.
pub struct RetrievalEngine<'a> {
    store: &'a MemoryStore,
    graph: &'a RelationshipGraph,
    index: &'a VectorIndex,
    /// Index position -> node id; entries for removed nodes are stale
    positions: &'a [NodeId],
    config: &'a RetrievalConfig,
}

impl<'a> RetrievalEngine<'a> {
    pub fn new(
        store: &'a MemoryStore,
        graph: &'a RelationshipGraph,
        index: &'a VectorIndex,
        positions: &'a [NodeId],
        config: &'a RetrievalConfig,
    ) -> Self {
        Self {
            store,
            graph,
            index,
            positions,
            config,
        }
    }

    /// Rank node ids for `query`, best first, at most `top_k` long.
    pub fn rank(&self, query: &RetrievalQuery) -> Result<Vec<(NodeId, f64)>> {
        if self.store.is_empty() || query.top_k == 0 {
            return Ok(Vec::new());
        }
        if query.embedding.len() != self.index.dim() {
            return Err(Error::dimension(self.index.dim(), query.embedding.len()));
        }
        if let Some(pos) = query.embedding.iter().position(|v| !v.is_finite()) {
            return Err(Error::validation(
                "query",
                format!("component {} is not finite", pos),
            ));
        }

        let mut primary = self.primary_candidates(query)?;
        if primary.is_empty() {
            return Ok(Vec::new());
        }
        sort_ranked(&mut primary);
        primary.truncate(query.top_k);

        if !query.include_neighbors {
            return Ok(primary);
        }

        let mut best: HashMap<NodeId, f64> = HashMap::new();
        for (id, score) in &primary {
            merge_max(&mut best, id.clone(), *score);
        }
        for (id, score) in &primary {
            let attenuated = score * self.config.neighbor_attenuation;
            for neighbor in self.graph.neighbors(id) {
                let Some(node) = self.store.get(&neighbor) else {
                    continue;
                };
                if query.accepts(node) {
                    merge_max(&mut best, neighbor, attenuated);
                }
            }
        }

        let mut merged: Vec<(NodeId, f64)> = best.into_iter().collect();
        sort_ranked(&mut merged);
        merged.truncate(query.top_k);
        Ok(merged)
    }

    fn primary_candidates(&self, query: &RetrievalQuery) -> Result<Vec<(NodeId, f64)>> {
        let indexed = self.index.len();
        let mut fetch = query
            .top_k
            .saturating_mul(self.config.overfetch_factor)
            .min(indexed);

        loop {
            let hits = self.index.search(&query.embedding, fetch)?;
            let returned = hits.len();
            let candidates: Vec<(NodeId, f64)> = hits
                .into_iter()
                .filter_map(|(position, distance)| self.score_hit(query, position, distance))
                .collect();

            if candidates.len() >= query.top_k || returned < fetch || fetch >= indexed {
                return Ok(candidates);
            }
            fetch = fetch.saturating_mul(2).min(indexed);
        }
    }

    /// Combined score for a live hit that passes the query filters.
    fn score_hit(&self, query: &RetrievalQuery, position: usize, distance: f32) -> Option<(NodeId, f64)> {
        let id = self.positions.get(position)?;
        let node = self.store.get(id)?;
        if !query.accepts(node) {
            return None;
        }
        let similarity = distance_to_similarity(distance);
        let score = self.config.similarity_weight * similarity
            + self.config.importance_weight * node.importance;
        Some((id.clone(), score))
    }
}

fn merge_max(best: &mut HashMap<NodeId, f64>, id: NodeId, score: f64) {
    best.entry(id)
        .and_modify(|s| *s = s.max(score))
        .or_insert(score);
}

/// Descending score, ties broken by id for a stable order.
fn sort_ranked(ranked: &mut [(NodeId, f64)]) {
    ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
}
