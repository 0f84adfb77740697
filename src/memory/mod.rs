//! Graph-structured episodic memory with vector recall.
//!
//! A [`NeuralGraphMemory`] keeps three structures in step:
//!
//! - **Node table**: every memory with its embedding, affect and usage counters
//! - **Relationship graph**: directed temporal and causal edges between memories
//! - **Vector index**: exact nearest-neighbor search over embeddings
//!
//! Retrieval blends embedding similarity with importance and can pull in
//! graph neighbors of the best matches. When the table grows past capacity,
//! the lowest-scoring memories (decayed importance plus an access boost) are
//! evicted.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ngm_core::memory::{MemoryInput, NeuralGraphMemory, RetrievalQuery};
//! use ngm_core::MemoryConfig;
//!
//! let mut memory = NeuralGraphMemory::new(MemoryConfig::compact(3))?;
//!
//! // Record an observation and its consequence
//! let cause = memory.insert(MemoryInput::new("door opened", vec![0.1, 0.9, 0.0]))?;
//! memory.insert(
//!     MemoryInput::new("cold draft", vec![0.2, 0.8, 0.1])
//!         .with_importance(0.8)
//!         .with_parent(cause),
//! )?;
//!
//! // Recall the closest memories and their neighbors
//! let results = memory.retrieve(&RetrievalQuery::new(vec![0.1, 0.9, 0.0]).top_k(3))?;
//!
//! memory.save("memory.json")?;
//! ```

mod encoder;
mod eviction;
mod graph;
mod index;
mod ngm;
mod persist;
mod proptest;
mod retrieval;
mod shared;
mod store;
mod types;

pub use encoder::{FeatureEncoder, GraphEncoding, SCALAR_FEATURES};
pub use eviction::EvictionManager;
pub use graph::RelationshipGraph;
pub use index::{distance_to_similarity, VectorIndex};
pub use ngm::{MemoryStatistics, NeuralGraphMemory};
pub use persist::{index_path, Snapshot, INDEX_SUFFIX, SNAPSHOT_VERSION};
pub use retrieval::{RetrievalEngine, RetrievalQuery, ScoredNode};
pub use shared::SharedGraphMemory;
pub use store::MemoryStore;
pub use types::{
    EdgeType, MemoryEdge, MemoryInput, MemoryNode, Metadata, Modality, NodeId,
};
