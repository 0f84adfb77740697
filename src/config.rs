//! Configuration for the neural graph memory.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default embedding dimension.
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Default maximum number of live nodes.
pub const DEFAULT_CAPACITY: usize = 100_000;

/// Default per-day importance decay.
pub const DEFAULT_DECAY_RATE: f64 = 0.95;

/// Top-level memory configuration.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Length of every stored and queried embedding
    pub embedding_dim: usize,
    /// Maximum number of live nodes after any insert
    pub capacity: usize,
    /// Importance multiplier applied per whole day of age
    pub decay_rate: f64,
    /// Number of most recent nodes linked to each new node
    pub temporal_lookback: usize,
    /// Strength of temporal edges
    pub temporal_strength: f64,
    /// Strength of causal (parent -> child) edges
    pub causal_strength: f64,
    /// Ranking parameters
    pub retrieval: RetrievalConfig,
    /// Capacity enforcement parameters
    pub eviction: EvictionConfig,
    /// HNSW graph parameters
    pub index: IndexConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            capacity: DEFAULT_CAPACITY,
            decay_rate: DEFAULT_DECAY_RATE,
            temporal_lookback: 5,
            temporal_strength: 0.5,
            causal_strength: 0.8,
            retrieval: RetrievalConfig::default(),
            eviction: EvictionConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Small-footprint configuration for embedded use and tests.
    pub fn compact(embedding_dim: usize) -> Self {
        Self {
            embedding_dim,
            capacity: 1_000,
            ..Self::default()
        }
    }

    /// Load a configuration document from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_decay_rate(mut self, decay_rate: f64) -> Self {
        self.decay_rate = decay_rate;
        self
    }

    pub fn with_temporal_lookback(mut self, lookback: usize) -> Self {
        self.temporal_lookback = lookback;
        self
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction.policy = policy;
        self
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(Error::Config("embedding_dim must be positive".into()));
        }
        if self.capacity == 0 {
            return Err(Error::Config("capacity must be positive".into()));
        }
        if !(self.decay_rate > 0.0 && self.decay_rate <= 1.0) {
            return Err(Error::Config(format!(
                "decay_rate must be within (0, 1], got {}",
                self.decay_rate
            )));
        }
        check_unit("temporal_strength", self.temporal_strength)?;
        check_unit("causal_strength", self.causal_strength)?;
        self.retrieval.validate()?;
        self.eviction.validate()?;
        self.index.validate()
    }
}

/// Weights and factors used by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested from the index per requested result
    pub overfetch_factor: usize,
    /// Weight of vector similarity in the combined score
    pub similarity_weight: f64,
    /// Weight of stored importance in the combined score
    pub importance_weight: f64,
    /// Multiplier applied to a primary score for its graph neighbours
    pub neighbor_attenuation: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            overfetch_factor: 3,
            similarity_weight: 0.7,
            importance_weight: 0.3,
            neighbor_attenuation: 0.6,
        }
    }
}

impl RetrievalConfig {
    fn validate(&self) -> Result<()> {
        if self.overfetch_factor == 0 {
            return Err(Error::Config("overfetch_factor must be positive".into()));
        }
        check_unit("similarity_weight", self.similarity_weight)?;
        check_unit("importance_weight", self.importance_weight)?;
        check_unit("neighbor_attenuation", self.neighbor_attenuation)
    }
}

/// How many nodes an eviction pass removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Remove the configured fraction, or the overflow if that is larger.
    /// Live count never exceeds capacity after an insert.
    #[default]
    Strict,
    /// Remove exactly floor(population * fraction). Small overflows may
    /// leave the store above capacity.
    Proportional,
}

impl std::fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Proportional => write!(f, "proportional"),
        }
    }
}

/// Parameters for eviction scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Share of the population removed per pass
    pub fraction: f64,
    /// Score added per recorded access
    pub access_boost_per_hit: f64,
    /// Upper bound of the access boost
    pub max_access_boost: f64,
    /// Removal count rule
    pub policy: EvictionPolicy,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            fraction: 0.10,
            access_boost_per_hit: 0.1,
            max_access_boost: 0.5,
            policy: EvictionPolicy::Strict,
        }
    }
}

impl EvictionConfig {
    fn validate(&self) -> Result<()> {
        check_unit("eviction.fraction", self.fraction)?;
        if !(self.access_boost_per_hit >= 0.0 && self.max_access_boost >= 0.0) {
            return Err(Error::Config("access boost values must be non-negative".into()));
        }
        Ok(())
    }
}

/// HNSW construction and search parameters for the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Graph degree (M)
    pub connectivity: usize,
    /// Candidate list size while inserting (ef_construction)
    pub expansion_add: usize,
    /// Candidate list size while searching (ef_search)
    pub expansion_search: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            connectivity: 16,
            expansion_add: 128,
            expansion_search: 64,
        }
    }
}

impl IndexConfig {
    fn validate(&self) -> Result<()> {
        if self.connectivity < 2 {
            return Err(Error::Config(format!(
                "index.connectivity must be at least 2, got {}",
                self.connectivity
            )));
        }
        if self.expansion_add == 0 || self.expansion_search == 0 {
            return Err(Error::Config("index expansion values must be positive".into()));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}
