//! Query normalization, shard-key derivation and prefix matching.

pub mod config;
pub mod engine;
pub mod normalize;

pub use config::SearchConfig;
pub use engine::{QueryEngine, QueryOutcome, QueryResults, SymbolMatch};
pub use normalize::normalize_query;
