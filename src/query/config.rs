//! Configuration for the query engine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SymshardError};

/// Configuration for [`QueryEngine`](crate::query::engine::QueryEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Queries with fewer characters than this return nothing and load
    /// nothing.
    pub min_query_len: usize,

    /// Maximum number of results handed to the renderer. Zero means
    /// unbounded.
    pub capacity: usize,

    /// Index sections searched for every query, e.g. `all` or `functions`.
    pub sections: Vec<String>,

    /// Give up on a shard load after this long.
    #[serde(with = "optional_millis")]
    pub load_timeout: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            capacity: 50,
            sections: vec!["all".to_string()],
            load_timeout: None,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_query_len(mut self, min_query_len: usize) -> Self {
        self.min_query_len = min_query_len;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections = sections.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: SearchConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_query_len == 0 {
            return Err(SymshardError::invalid_config(
                "min_query_len must be at least 1",
            ));
        }
        if self.sections.is_empty() {
            return Err(SymshardError::invalid_config(
                "at least one section must be searched",
            ));
        }
        if let Some(timeout) = self.load_timeout
            && timeout.is_zero()
        {
            return Err(SymshardError::invalid_config(
                "load_timeout must be positive",
            ));
        }
        Ok(())
    }
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis().min(u64::MAX as u128) as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.min_query_len, 2);
        assert_eq!(config.capacity, 50);
        assert_eq!(config.sections, vec!["all"]);
        assert_eq!(config.load_timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SearchConfig::new()
            .with_min_query_len(3)
            .with_capacity(10)
            .with_sections(["all", "functions"])
            .with_load_timeout(Duration::from_millis(250));

        assert_eq!(config.min_query_len, 3);
        assert_eq!(config.capacity, 10);
        assert_eq!(config.sections, vec!["all", "functions"]);
        assert_eq!(config.load_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SearchConfig::new().with_min_query_len(0).validate().is_err());
        assert!(
            SearchConfig::new()
                .with_sections(Vec::<String>::new())
                .validate()
                .is_err()
        );
        assert!(
            SearchConfig::new()
                .with_load_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"min_query_len": 3, "sections": ["functions"], "load_timeout": 500}"#,
        )
        .unwrap();

        let config = SearchConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.min_query_len, 3);
        assert_eq!(config.capacity, 50);
        assert_eq!(config.sections, vec!["functions"]);
        assert_eq!(config.load_timeout, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SearchConfig::new().with_load_timeout(Duration::from_millis(75));
        let json = serde_json::to_string(&config).unwrap();
        let back: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_oversized_timeout_serializes_saturated() {
        let config = SearchConfig::new().with_load_timeout(Duration::from_secs(u64::MAX));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["load_timeout"], serde_json::json!(u64::MAX));
    }
}
