//! Core types for episodic memory nodes and their relationships.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Opaque key-value metadata attached to nodes and edges.
pub type Metadata = HashMap<String, Value>;

/// Unique identifier for a memory node.
///
/// Formatted as `mem_<unix micros>_<sequence>`. The sequence component comes
/// from the owning store and is never reused, so ids stay unique even when
/// several nodes are created within the same clock tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Build an id from a creation time and store sequence number.
    pub fn generate(created_at: DateTime<Utc>, sequence: u64) -> Self {
        Self(format!("mem_{}_{}", created_at.timestamp_micros(), sequence))
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::validation("node_id", format!("malformed id '{}'", s));
        let rest = s.strip_prefix("mem_").ok_or_else(invalid)?;
        let (micros, seq) = rest.split_once('_').ok_or_else(invalid)?;
        micros.parse::<i64>().map_err(|_| invalid())?;
        seq.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of content a memory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Text,
    Image,
    Audio,
    Video,
    Multimodal,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Multimodal => write!(f, "multimodal"),
        }
    }
}

impl std::str::FromStr for Modality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "multimodal" => Ok(Self::Multimodal),
            other => Err(Error::validation(
                "modality",
                format!("unknown modality '{}'", other),
            )),
        }
    }
}

/// Caller-supplied fields for a new memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryInput {
    pub content: String,
    pub embedding: Vec<f32>,
    pub modality: Modality,
    pub metadata: Metadata,
    /// Emotional tone, -1 (negative) to +1 (positive)
    pub valence: f64,
    /// Significance, 0 to 1
    pub importance: f64,
    /// Causally preceding memories
    pub parent_ids: Vec<NodeId>,
}

impl MemoryInput {
    /// Create input with neutral valence and medium importance.
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            content: content.into(),
            embedding,
            modality: Modality::Text,
            metadata: Metadata::new(),
            valence: 0.0,
            importance: 0.5,
            parent_ids: Vec::new(),
        }
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_valence(mut self, valence: f64) -> Self {
        self.valence = valence;
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent_ids.push(parent);
        self
    }

    pub fn with_parents(mut self, parents: impl IntoIterator<Item = NodeId>) -> Self {
        self.parent_ids.extend(parents);
        self
    }

    /// Check ranges and embedding shape without touching any state.
    pub fn validate(&self, embedding_dim: usize) -> Result<()> {
        if self.embedding.len() != embedding_dim {
            return Err(Error::dimension(embedding_dim, self.embedding.len()));
        }
        if let Some(pos) = self.embedding.iter().position(|v| !v.is_finite()) {
            return Err(Error::validation(
                "embedding",
                format!("component {} is not finite", pos),
            ));
        }
        validate_importance(self.importance)?;
        validate_valence(self.valence)
    }
}

fn validate_importance(importance: f64) -> Result<()> {
    if (0.0..=1.0).contains(&importance) {
        Ok(())
    } else {
        Err(Error::validation(
            "importance",
            format!("must be within [0, 1], got {}", importance),
        ))
    }
}

fn validate_valence(valence: f64) -> Result<()> {
    if (-1.0..=1.0).contains(&valence) {
        Ok(())
    } else {
        Err(Error::validation(
            "valence",
            format!("must be within [-1, 1], got {}", valence),
        ))
    }
}

/// A single episodic memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    pub id: NodeId,
    /// Store sequence number; breaks creation-time ties
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub embedding: Vec<f32>,
    pub modality: Modality,
    #[serde(default)]
    pub metadata: Metadata,
    pub valence: f64,
    pub importance: f64,
    /// Number of retrievals that returned this node
    #[serde(default)]
    pub access_count: u64,
}

impl MemoryNode {
    /// Build a node from validated input. Range violations fail construction.
    pub fn new(
        id: NodeId,
        sequence: u64,
        created_at: DateTime<Utc>,
        input: MemoryInput,
    ) -> Result<Self> {
        validate_importance(input.importance)?;
        validate_valence(input.valence)?;

        Ok(Self {
            id,
            sequence,
            created_at,
            content: input.content,
            embedding: input.embedding,
            modality: input.modality,
            metadata: input.metadata,
            valence: input.valence,
            importance: input.importance,
            access_count: 0,
        })
    }

    /// Chronological sort key.
    pub fn chrono_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }

    /// Age in whole days at `now`, never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    /// Check invariants of a node that came from outside (e.g. a snapshot).
    pub fn check(&self) -> Result<()> {
        validate_importance(self.importance)?;
        validate_valence(self.valence)
    }
}

/// Type of relationship between two memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Created close together in time
    Temporal,
    /// Source led to target
    Causal,
    /// Loosely associated
    Associative,
    /// Similar meaning
    Semantic,
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temporal => write!(f, "temporal"),
            Self::Causal => write!(f, "causal"),
            Self::Associative => write!(f, "associative"),
            Self::Semantic => write!(f, "semantic"),
        }
    }
}

/// A directed, typed relationship between two memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: EdgeType,
    /// Strength in [0, 1]
    pub strength: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl MemoryEdge {
    pub fn new(source: NodeId, target: NodeId, edge_type: EdgeType, strength: f64) -> Self {
        Self {
            source,
            target,
            edge_type,
            strength: strength.clamp(0.0, 1.0),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
