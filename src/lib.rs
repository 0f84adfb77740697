//! # ngm-core
//!
//! Neural Graph Memory: an episodic memory store for agents that need to
//! remember what happened, in what order, and why.
//!
//! ## Core Components
//!
//! - **Memory**: node table, relationship graph and vector index behind one facade
//! - **Config**: capacity, decay, linking and retrieval weights
//! - **Error**: a single error type for validation, persistence and I/O failures
//!
//! ## Example
//!
//! ```rust,ignore
//! use ngm_core::{MemoryConfig, MemoryInput, NeuralGraphMemory, RetrievalQuery};
//!
//! let mut memory = NeuralGraphMemory::new(MemoryConfig::default())?;
//! let id = memory.insert(MemoryInput::new("met Ada at the station", embedding))?;
//!
//! for hit in memory.retrieve(&RetrievalQuery::new(query_embedding).top_k(5))? {
//!     println!("{:.3} {}", hit.score, hit.node.content);
//! }
//! ```

pub mod config;
pub mod error;
pub mod memory;

// Re-exports for convenience
pub use config::{EvictionConfig, EvictionPolicy, IndexConfig, MemoryConfig, RetrievalConfig};
pub use error::{Error, Result};
pub use memory::{
    EdgeType, MemoryEdge, MemoryInput, MemoryNode, MemoryStatistics, Modality,
    NeuralGraphMemory, NodeId, RetrievalQuery, ScoredNode, SharedGraphMemory,
};
