//! Shard data model, wire-format parser and partition schemes.
//!
//! A shard is one independently loadable slice of the symbol index. This
//! module contains everything that is pure data: the record types, the
//! payload parser, and the functions that map a query to shard ids.

pub mod parser;
pub mod partition;
pub mod record;

pub use parser::parse_shard;
pub use partition::{IndexSection, Partitioner, PrefixTablePartitioner, SectionPartitioner};
pub use record::{LinkKind, Occurrence, ShardRecord, SymbolEntry, decode_entities};
