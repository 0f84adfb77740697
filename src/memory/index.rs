//! Vector index over node embeddings.
//!
//! HNSW approximate search (usearch) under the squared-L2 metric. Positions
//! are assigned in insertion order and used as index keys; they are never
//! reused or removed. When a node is deleted its position goes stale, and
//! callers filter stale positions at read time. A full rebuild (see
//! `NeuralGraphMemory::rebuild_index`) is the only way to reclaim them.

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

/// Slots reserved the first time the index grows.
const MIN_RESERVE: usize = 64;

/// Append-only HNSW index keyed by position.
pub struct VectorIndex {
    dim: usize,
    inner: Index,
    searches: AtomicU64,
}

impl VectorIndex {
    /// Create an empty index for `dim`-length embeddings.
    pub fn new(dim: usize, config: &IndexConfig) -> Result<Self> {
        let inner = Index::new(&options(dim, config)).map_err(Error::index)?;
        Ok(Self {
            dim,
            inner,
            searches: AtomicU64::new(0),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of positions, stale ones included.
    pub fn len(&self) -> usize {
        self.inner.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of searches served since creation.
    pub fn search_count(&self) -> u64 {
        self.searches.load(AtomicOrdering::Relaxed)
    }

    /// Append an embedding and return its position.
    pub fn add(&mut self, embedding: &[f32]) -> Result<usize> {
        if embedding.len() != self.dim {
            return Err(Error::dimension(self.dim, embedding.len()));
        }
        let position = self.len();
        if position >= self.inner.capacity() {
            let target = (self.inner.capacity() * 2).max(MIN_RESERVE);
            self.inner.reserve(target).map_err(Error::index)?;
        }
        self.inner
            .add(position as u64, embedding)
            .map_err(Error::index)?;
        Ok(position)
    }

    /// The `k` nearest positions to `query` by squared Euclidean distance,
    /// closest first. Returns fewer than `k` when the index is smaller.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(Error::dimension(self.dim, query.len()));
        }
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }
        self.searches.fetch_add(1, AtomicOrdering::Relaxed);

        let matches = self.inner.search(query, k).map_err(Error::index)?;
        let mut hits: Vec<(usize, f32)> = matches
            .keys
            .into_iter()
            .zip(matches.distances)
            .map(|(key, distance)| (key as usize, distance))
            .collect();
        hits.sort_by(compare_hits);
        Ok(hits)
    }

    /// Serialize with usearch's own format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; self.inner.serialized_length()];
        self.inner
            .save_to_buffer(&mut buffer)
            .map_err(Error::index)?;
        Ok(buffer)
    }

    /// Restore a buffer produced by [`to_bytes`](Self::to_bytes). The stored
    /// dimension must equal `dim`.
    pub fn from_bytes(bytes: &[u8], dim: usize, config: &IndexConfig) -> Result<Self> {
        let index = Self::new(dim, config)?;
        index
            .inner
            .load_from_buffer(bytes)
            .map_err(|e| Error::persistence(format!("unreadable index blob: {}", e)))?;
        if index.inner.dimensions() != dim {
            return Err(Error::persistence(format!(
                "index dimension {} does not match configured {}",
                index.inner.dimensions(),
                dim
            )));
        }
        Ok(index)
    }
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dim", &self.dim)
            .field("len", &self.len())
            .field("searches", &self.search_count())
            .finish()
    }
}

fn options(dim: usize, config: &IndexConfig) -> IndexOptions {
    IndexOptions {
        dimensions: dim,
        metric: MetricKind::L2sq,
        quantization: ScalarKind::F32,
        connectivity: config.connectivity,
        expansion_add: config.expansion_add,
        expansion_search: config.expansion_search,
        multi: false,
    }
}

fn compare_hits(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

/// Map a distance into (0, 1]; identical vectors score 1.
pub fn distance_to_similarity(distance: f32) -> f64 {
    1.0 / (1.0 + f64::from(distance.max(0.0)))
}
