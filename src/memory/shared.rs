//! Thread-safe handle around a [`NeuralGraphMemory`].
//!
//! One reader-writer lock spans the node table, graph and index together.
//! Statistics, context windows and saves share the read side; inserts,
//! retrievals (access counters) and loads take the write side.

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::memory::ngm::{MemoryStatistics, NeuralGraphMemory};
use crate::memory::retrieval::{RetrievalQuery, ScoredNode};
use crate::memory::types::{MemoryInput, MemoryNode, NodeId};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Cloneable, lock-guarded memory handle.
#[derive(Debug, Clone)]
pub struct SharedGraphMemory {
    inner: Arc<RwLock<NeuralGraphMemory>>,
}

impl SharedGraphMemory {
    pub fn new(config: MemoryConfig) -> Result<Self> {
        Ok(Self::from_memory(NeuralGraphMemory::new(config)?))
    }

    pub fn from_memory(memory: NeuralGraphMemory) -> Self {
        Self {
            inner: Arc::new(RwLock::new(memory)),
        }
    }

    /// Run `f` under the read lock.
    pub fn with_read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&NeuralGraphMemory) -> T,
    {
        let guard = self
            .inner
            .read()
            .map_err(|e| Error::Internal(format!("Failed to lock memory: {}", e)))?;
        Ok(f(&guard))
    }

    /// Run `f` under the write lock.
    pub fn with_write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut NeuralGraphMemory) -> T,
    {
        let mut guard = self
            .inner
            .write()
            .map_err(|e| Error::Internal(format!("Failed to lock memory: {}", e)))?;
        Ok(f(&mut guard))
    }

    pub fn insert(&self, input: MemoryInput) -> Result<NodeId> {
        self.with_write(|m| m.insert(input))?
    }

    pub fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<ScoredNode>> {
        self.with_write(|m| m.retrieve(query))?
    }

    pub fn remove(&self, id: &NodeId) -> Result<bool> {
        self.with_write(|m| m.remove(id))
    }

    pub fn context_window(&self, id: &NodeId, window_size: usize) -> Result<Vec<MemoryNode>> {
        self.with_read(|m| m.context_window(id, window_size))
    }

    pub fn statistics(&self) -> Result<MemoryStatistics> {
        self.with_read(|m| m.statistics())
    }

    pub fn len(&self) -> Result<usize> {
        self.with_read(|m| m.len())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.with_read(|m| m.save(path))?
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        self.with_write(|m| m.load(path))?
    }

    /// Save on tokio's blocking pool so large snapshots stay off the caller's
    /// task. Must be called from within a tokio runtime.
    #[cfg(feature = "tokio-runtime")]
    pub fn save_in_background(
        &self,
        path: impl Into<std::path::PathBuf>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let handle = self.clone();
        let path = path.into();
        tokio::task::spawn_blocking(move || handle.save(&path))
    }
}
