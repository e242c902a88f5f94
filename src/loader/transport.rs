//! Shard transports backed by a directory or by memory.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ShardLoadError;
use crate::loader::ShardTransport;

/// Reads `<root>/<shard_id>.js`, the layout the generator writes.
#[derive(Debug, Clone)]
pub struct DirectoryTransport {
    root: PathBuf,
    extension: String,
}

impl DirectoryTransport {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: "js".to_string(),
        }
    }

    /// Use a different file extension (without the dot).
    pub fn with_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `shard_id`.
    ///
    /// Shard ids are restricted to `[A-Za-z0-9_]` so that a hostile id cannot
    /// escape the root directory.
    pub fn shard_path(&self, shard_id: &str) -> Result<PathBuf, ShardLoadError> {
        if shard_id.is_empty()
            || !shard_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ShardLoadError::transport(shard_id, "invalid shard id"));
        }
        Ok(self.root.join(format!("{shard_id}.{}", self.extension)))
    }
}

#[async_trait]
impl ShardTransport for DirectoryTransport {
    async fn fetch(&self, shard_id: &str) -> Result<Vec<u8>, ShardLoadError> {
        let path = self.shard_path(shard_id)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ShardLoadError::not_found(shard_id),
            _ => ShardLoadError::transport(shard_id, format!("{}: {e}", path.display())),
        })
    }
}

/// In-memory transport, useful for tests and for embedding a prebuilt index.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    shards: Arc<RwLock<AHashMap<String, Arc<[u8]>>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>, P: AsRef<str>>(&self, shard_id: S, payload: P) {
        self.insert_bytes(shard_id, payload.as_ref().as_bytes().to_vec());
    }

    pub fn insert_bytes<S: Into<String>>(&self, shard_id: S, payload: Vec<u8>) {
        self.shards.write().insert(shard_id.into(), Arc::from(payload));
    }

    pub fn remove(&self, shard_id: &str) -> bool {
        self.shards.write().remove(shard_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.shards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.read().is_empty()
    }
}

#[async_trait]
impl ShardTransport for MemoryTransport {
    async fn fetch(&self, shard_id: &str) -> Result<Vec<u8>, ShardLoadError> {
        self.shards
            .read()
            .get(shard_id)
            .map(|payload| payload.to_vec())
            .ok_or_else(|| ShardLoadError::not_found(shard_id))
    }
}
