//! Fetching and parsing shards.
//!
//! Two traits split the work:
//!
//! - [`ShardTransport`] retrieves raw bytes for a shard id (filesystem,
//!   memory, network). It knows nothing about the payload format.
//! - [`ShardLoader`] turns a shard id into a parsed [`ShardRecord`].
//!   [`TransportLoader`] is the standard implementation: fetch through a
//!   transport, then parse.

pub mod transport;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::error::ShardLoadError;
use crate::shard::parser::parse_shard;
use crate::shard::record::ShardRecord;

pub use transport::{DirectoryTransport, MemoryTransport};

/// Source of raw shard payloads.
#[async_trait]
pub trait ShardTransport: Send + Sync + Debug {
    /// Fetch the raw payload for `shard_id`.
    ///
    /// Returns [`ShardLoadError::NotFound`] when the partition does not exist.
    async fn fetch(&self, shard_id: &str) -> Result<Vec<u8>, ShardLoadError>;
}

#[async_trait]
impl<T: ShardTransport + ?Sized> ShardTransport for Arc<T> {
    async fn fetch(&self, shard_id: &str) -> Result<Vec<u8>, ShardLoadError> {
        (**self).fetch(shard_id).await
    }
}

/// Produces parsed shards on demand.
#[async_trait]
pub trait ShardLoader: Send + Sync + Debug {
    async fn load(&self, shard_id: &str) -> Result<ShardRecord, ShardLoadError>;
}

/// Loader that fetches through a [`ShardTransport`] and parses the payload.
#[derive(Debug)]
pub struct TransportLoader<T: ShardTransport> {
    transport: T,
}

impl<T: ShardTransport> TransportLoader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: ShardTransport> ShardLoader for TransportLoader<T> {
    async fn load(&self, shard_id: &str) -> Result<ShardRecord, ShardLoadError> {
        let bytes = self.transport.fetch(shard_id).await?;
        debug!("fetched shard {shard_id} ({} bytes)", bytes.len());

        let text = String::from_utf8(bytes)
            .map_err(|e| ShardLoadError::parse(shard_id, format!("payload is not UTF-8: {e}")))?;
        parse_shard(shard_id, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transport_loader_parses_payload() {
        let transport = MemoryTransport::new();
        transport.insert(
            "all_11",
            "var searchData=[['sort_4',['sort',['../namespacetstl.html#ae56c',1,'tstl::sort()']]]];",
        );
        let loader = TransportLoader::new(transport);

        let record = loader.load("all_11").await.unwrap();
        assert_eq!(record.shard_id(), "all_11");
        assert_eq!(record.entries()[0].label, "sort");
    }

    #[tokio::test]
    async fn test_transport_loader_reports_missing_and_corrupt_shards() {
        let transport = MemoryTransport::new();
        transport.insert("all_3", "var searchData=[['broken'");
        transport.insert_bytes("all_4", vec![0xff, 0xfe, 0x00]);
        let loader = TransportLoader::new(transport);

        assert!(loader.load("all_9").await.unwrap_err().is_not_found());
        assert!(matches!(
            loader.load("all_3").await,
            Err(ShardLoadError::Parse { .. })
        ));
        assert!(matches!(
            loader.load("all_4").await,
            Err(ShardLoadError::Parse { .. })
        ));
    }
}
