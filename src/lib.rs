//! # Symshard
//!
//! Incremental prefix search over a documentation site's sharded symbol
//! index.
//!
//! The index generator writes one small script per partition
//! (`all_11.js`, `functions_8.js`, ...) plus a `searchdata.js` that names
//! the partitions. This crate consumes that output without ever loading the
//! whole index:
//!
//! - [`shard`] parses shard payloads and reproduces the partition scheme
//! - [`loader`] fetches payloads through a pluggable transport
//! - [`store`] caches parsed shards and deduplicates concurrent loads
//! - [`query`] derives candidate shards for a query and ranks prefix matches
//! - [`aggregator`] removes duplicate targets and applies the display budget
//! - [`session`] delivers results to a renderer, discarding stale queries

pub mod aggregator;
pub mod cli;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod query;
pub mod session;
pub mod shard;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub mod prelude {
    pub use crate::aggregator::{AggregatedResults, ResultAggregator};
    pub use crate::error::{Result, ShardLoadError, SymshardError};
    pub use crate::loader::{
        DirectoryTransport, MemoryTransport, ShardLoader, ShardTransport, TransportLoader,
    };
    pub use crate::query::{QueryEngine, QueryOutcome, QueryResults, SearchConfig, SymbolMatch};
    pub use crate::session::{Delivery, ResultRenderer, SearchSession};
    pub use crate::shard::{
        Occurrence, Partitioner, PrefixTablePartitioner, SectionPartitioner, ShardRecord,
        SymbolEntry,
    };
    pub use crate::store::{ShardState, ShardStore};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
