//! Snapshot persistence.
//!
//! A snapshot is two files:
//!
//! - the primary JSON document at `path`: configuration, node records, edge
//!   list, the index-position -> node-id array, and a SHA-256 of the index blob
//! - the usearch index blob at `path` + [`INDEX_SUFFIX`]
//!
//! Both are written to temporary siblings first and renamed into place.

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::memory::index::VectorIndex;
use crate::memory::types::{MemoryEdge, MemoryNode, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Suffix appended to the document path for the index blob.
pub const INDEX_SUFFIX: &str = ".index";

/// Full serialized state of a memory instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version for compatibility checking
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub config: MemoryConfig,
    /// Next id sequence number, so restored stores never reuse ids
    pub next_sequence: u64,
    /// Nodes in chronological order
    pub nodes: Vec<MemoryNode>,
    pub edges: Vec<MemoryEdge>,
    /// Node id for each index position, stale ones included
    pub index_to_node_id: Vec<NodeId>,
    /// Hex SHA-256 of the index blob
    pub index_checksum: String,
}

impl Snapshot {
    /// Write the document and its index blob.
    pub fn write(&mut self, path: &Path, index: &VectorIndex) -> Result<()> {
        let blob = index.to_bytes()?;
        self.index_checksum = checksum(&blob);

        let blob_path = index_path(path);
        let document = serde_json::to_vec_pretty(self)?;

        write_atomic(&blob_path, &blob)?;
        write_atomic(path, &document)?;
        Ok(())
    }

    /// Read and cross-check a document and its blob against an instance
    /// configured for `embedding_dim`.
    pub fn read(path: &Path, embedding_dim: usize) -> Result<(Self, VectorIndex)> {
        let document = fs::read(path)?;
        let snapshot: Self = serde_json::from_slice(&document)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::persistence(format!(
                "snapshot version mismatch: expected {}, found {}",
                SNAPSHOT_VERSION, snapshot.version
            )));
        }
        if snapshot.config.embedding_dim != embedding_dim {
            return Err(Error::persistence(format!(
                "snapshot embedding dimension {} does not match configured {}",
                snapshot.config.embedding_dim, embedding_dim
            )));
        }

        let blob = fs::read(index_path(path))?;
        if checksum(&blob) != snapshot.index_checksum {
            return Err(Error::persistence("index blob checksum mismatch"));
        }
        let index = VectorIndex::from_bytes(&blob, embedding_dim, &snapshot.config.index)?;
        if index.len() != snapshot.index_to_node_id.len() {
            return Err(Error::persistence(format!(
                "index holds {} positions but mapping lists {}",
                index.len(),
                snapshot.index_to_node_id.len()
            )));
        }

        Ok((snapshot, index))
    }
}

/// Location of the index blob for a document at `path`.
pub fn index_path(path: &Path) -> PathBuf {
    with_suffix(path, INDEX_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = with_suffix(path, ".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
