//! Error types for the symshard library.
//!
//! Two layers of errors exist:
//!
//! - [`ShardLoadError`] describes why a single shard could not be made
//!   available. It is `Clone` because every caller waiting on a deduplicated
//!   load receives the same failure.
//! - [`SymshardError`] is the crate-wide error returned by configuration,
//!   CLI and I/O paths. Shard failures convert into it via `From`.
//!
//! # Examples
//!
//! ```
//! use symshard::error::{Result, SymshardError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SymshardError::invalid_config("capacity must be positive"))
//! }
//!
//! assert!(example_operation().is_err());
//! ```

use std::io;

use thiserror::Error;

/// Why a shard could not be loaded.
///
/// None of these are fatal: a failed shard degrades search for its own
/// partition only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShardLoadError {
    /// The requested partition does not exist.
    #[error("shard not found: {shard_id}")]
    NotFound { shard_id: String },

    /// The payload was fetched but is malformed.
    #[error("failed to parse shard {shard_id}: {message}")]
    Parse { shard_id: String, message: String },

    /// The transport failed for a reason other than absence.
    #[error("failed to fetch shard {shard_id}: {message}")]
    Transport { shard_id: String, message: String },

    /// The load did not finish within the configured timeout.
    #[error("loading shard {shard_id} timed out after {millis}ms")]
    TimedOut { shard_id: String, millis: u64 },
}

impl ShardLoadError {
    /// Create a not-found error.
    pub fn not_found<S: Into<String>>(shard_id: S) -> Self {
        ShardLoadError::NotFound {
            shard_id: shard_id.into(),
        }
    }

    /// Create a parse error.
    pub fn parse<S: Into<String>, M: Into<String>>(shard_id: S, message: M) -> Self {
        ShardLoadError::Parse {
            shard_id: shard_id.into(),
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport<S: Into<String>, M: Into<String>>(shard_id: S, message: M) -> Self {
        ShardLoadError::Transport {
            shard_id: shard_id.into(),
            message: message.into(),
        }
    }

    /// The shard this error refers to.
    pub fn shard_id(&self) -> &str {
        match self {
            ShardLoadError::NotFound { shard_id }
            | ShardLoadError::Parse { shard_id, .. }
            | ShardLoadError::Transport { shard_id, .. }
            | ShardLoadError::TimedOut { shard_id, .. } => shard_id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ShardLoadError::NotFound { .. })
    }
}

/// The main error type for symshard operations.
#[derive(Error, Debug)]
pub enum SymshardError {
    /// I/O errors (file operations, transport, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A shard could not be loaded.
    #[error("Shard error: {0}")]
    Shard(#[from] ShardLoadError),

    /// The partition index (`searchdata.js`) is malformed.
    #[error("Partition error: {0}")]
    Partition(String),

    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SymshardError.
pub type Result<T> = std::result::Result<T, SymshardError>;

impl SymshardError {
    /// Create a new partition error.
    pub fn partition<S: Into<String>>(msg: S) -> Self {
        SymshardError::Partition(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SymshardError::InvalidConfig(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SymshardError::Other(msg.into())
    }
}
