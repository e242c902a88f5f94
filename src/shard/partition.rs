//! Mapping from queries to the shards that can contain their matches.
//!
//! The partition function belongs to the generator, not to the search
//! engine. [`SectionPartitioner`] reproduces the generator's naming scheme
//! from the `searchdata.js` index it publishes next to the shards:
//!
//! ```text
//! var indexSectionsWithContent = { 0: "_abcdefghiklmnoprstuv~", ... };
//! var indexSectionNames        = { 0: "all", ... };
//! var indexSectionLabels       = { 0: "All", ... };
//! ```
//!
//! A symbol lands in shard `<name>_<i>` where `i` is the lowercase
//! hexadecimal position of its first (lowercased) character in the
//! section's character set. For the set above, `s` sits at position 17,
//! so every symbol starting with `s` is in `all_11`.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SymshardError};
use crate::shard::parser::parse_string_literal;

lazy_static! {
    static ref TABLE_ENTRY: Regex = Regex::new(r#"(\d+)\s*:\s*("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')"#)
        .expect("table entry pattern is valid");
}

/// Trait for deriving candidate shards from a normalized query.
pub trait Partitioner: Send + Sync + Debug {
    /// Shard ids within `section` that may hold labels starting with
    /// `normalized_query`. Deterministic and sorted; empty when the section
    /// has no shard for the query.
    fn candidates(&self, section: &str, normalized_query: &str) -> Vec<String>;

    /// Names of the sections this partitioner knows about.
    fn sections(&self) -> Vec<String>;

    /// Number of leading characters that select a shard.
    fn key_len(&self) -> usize;

    /// Every shard id the partitioner can produce.
    fn all_shards(&self) -> Vec<String>;

    /// Get a human-readable description of this partitioner.
    fn description(&self) -> String;

    fn has_section(&self, section: &str) -> bool {
        self.sections().iter().any(|name| name == section)
    }
}

/// One search category published by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSection {
    /// Position in the generator's section table.
    pub id: usize,

    /// Shard name prefix, e.g. `all` or `functions`.
    pub name: String,

    /// Human-readable label, e.g. `Functions`.
    pub label: String,

    /// Leading characters that have a shard, in shard order.
    pub chars: Vec<char>,
}

impl IndexSection {
    pub fn new<N: Into<String>, L: Into<String>>(id: usize, name: N, label: L, chars: &str) -> Self {
        Self {
            id,
            name: name.into(),
            label: label.into(),
            chars: chars.chars().collect(),
        }
    }

    /// Shard holding symbols whose first character is `first`.
    pub fn shard_for(&self, first: char) -> Option<String> {
        self.chars
            .iter()
            .position(|c| *c == first)
            .map(|position| format!("{}_{:x}", self.name, position))
    }

    pub fn shard_ids(&self) -> Vec<String> {
        (0..self.chars.len())
            .map(|position| format!("{}_{:x}", self.name, position))
            .collect()
    }
}

/// Partition scheme keyed on the first character within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPartitioner {
    sections: Vec<IndexSection>,
}

impl SectionPartitioner {
    pub fn new(sections: Vec<IndexSection>) -> Result<Self> {
        let partitioner = Self { sections };
        partitioner.validate()?;
        Ok(partitioner)
    }

    /// Build from the text of a `searchdata.js` index.
    pub fn from_searchdata(text: &str) -> Result<Self> {
        let contents = read_table(text, "indexSectionsWithContent")?;
        let names = read_table(text, "indexSectionNames")?;
        // Labels are optional; fall back to the section name.
        let labels = read_table(text, "indexSectionLabels").unwrap_or_default();

        let mut sections = Vec::with_capacity(names.len());
        for (id, name) in &names {
            let chars = contents.get(id).ok_or_else(|| {
                SymshardError::partition(format!("section {id} ('{name}') has no content entry"))
            })?;
            let label = labels.get(id).cloned().unwrap_or_else(|| name.clone());
            sections.push(IndexSection::new(*id, name.clone(), label, chars));
        }

        Self::new(sections)
    }

    /// Read `searchdata.js` from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_searchdata(&text)
    }

    pub fn section(&self, name: &str) -> Option<&IndexSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn index_sections(&self) -> &[IndexSection] {
        &self.sections
    }

    fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(SymshardError::partition("no index sections defined"));
        }
        for (position, section) in self.sections.iter().enumerate() {
            if section.name.is_empty() {
                return Err(SymshardError::partition(format!(
                    "section {} has an empty name",
                    section.id
                )));
            }
            if self.sections[..position]
                .iter()
                .any(|other| other.name == section.name)
            {
                return Err(SymshardError::partition(format!(
                    "section name '{}' is defined twice",
                    section.name
                )));
            }
            let mut seen = section.chars.clone();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != section.chars.len() {
                return Err(SymshardError::partition(format!(
                    "section '{}' lists a character twice",
                    section.name
                )));
            }
        }
        Ok(())
    }
}

impl Partitioner for SectionPartitioner {
    fn candidates(&self, section: &str, normalized_query: &str) -> Vec<String> {
        let Some(first) = normalized_query.chars().next() else {
            return Vec::new();
        };
        self.section(section)
            .and_then(|section| section.shard_for(first))
            .into_iter()
            .collect()
    }

    fn sections(&self) -> Vec<String> {
        self.sections.iter().map(|section| section.name.clone()).collect()
    }

    fn key_len(&self) -> usize {
        1
    }

    fn all_shards(&self) -> Vec<String> {
        let mut shards: Vec<String> = self
            .sections
            .iter()
            .flat_map(|section| section.shard_ids())
            .collect();
        shards.sort();
        shards
    }

    fn description(&self) -> String {
        format!(
            "SectionPartitioner({} sections, first-character keys)",
            self.sections.len()
        )
    }
}

/// Explicit table from partition key to shard id within a single section.
///
/// Partition keys are prefixes of at most `key_len` characters. A query
/// shorter than a key selects every shard whose key extends it, which is
/// the bounded multi-shard case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixTablePartitioner {
    section: String,
    key_len: usize,
    table: BTreeMap<String, String>,
}

impl PrefixTablePartitioner {
    pub fn new<S: Into<String>>(section: S, table: BTreeMap<String, String>) -> Result<Self> {
        let section = section.into();
        if table.is_empty() {
            return Err(SymshardError::partition("prefix table is empty"));
        }
        if table.keys().any(|key| key.is_empty() || key.to_lowercase() != *key) {
            return Err(SymshardError::partition(
                "prefix table keys must be non-empty and lowercase",
            ));
        }
        let key_len = table.keys().map(|key| key.chars().count()).max().unwrap_or(0);
        Ok(Self {
            section,
            key_len,
            table,
        })
    }
}

impl Partitioner for PrefixTablePartitioner {
    fn candidates(&self, section: &str, normalized_query: &str) -> Vec<String> {
        if section != self.section || normalized_query.is_empty() {
            return Vec::new();
        }
        let mut shards: Vec<String> = self
            .table
            .iter()
            .filter(|(key, _)| {
                key.starts_with(normalized_query) || normalized_query.starts_with(key.as_str())
            })
            .map(|(_, shard)| shard.clone())
            .collect();
        shards.sort();
        shards.dedup();
        shards
    }

    fn sections(&self) -> Vec<String> {
        vec![self.section.clone()]
    }

    fn key_len(&self) -> usize {
        self.key_len
    }

    fn all_shards(&self) -> Vec<String> {
        let mut shards: Vec<String> = self.table.values().cloned().collect();
        shards.sort();
        shards.dedup();
        shards
    }

    fn description(&self) -> String {
        format!(
            "PrefixTablePartitioner(section '{}', {} keys of up to {} chars)",
            self.section,
            self.table.len(),
            self.key_len
        )
    }
}

/// Read one `var <name> = { 0: "...", ... };` table.
fn read_table(text: &str, name: &str) -> Result<BTreeMap<usize, String>> {
    let start = text
        .find(name)
        .ok_or_else(|| SymshardError::partition(format!("missing table '{name}'")))?;
    let rest = &text[start + name.len()..];
    let open = rest
        .find('{')
        .ok_or_else(|| SymshardError::partition(format!("table '{name}' has no body")))?;
    let close = rest[open..]
        .find('}')
        .ok_or_else(|| SymshardError::partition(format!("table '{name}' is not closed")))?;
    let body = &rest[open + 1..open + close];

    let mut table = BTreeMap::new();
    for captures in TABLE_ENTRY.captures_iter(body) {
        let id: usize = captures[1]
            .parse()
            .map_err(|_| SymshardError::partition(format!("bad section id in '{name}'")))?;
        let value = parse_string_literal(&captures[2])
            .map_err(|e| SymshardError::partition(format!("table '{name}': {e}")))?;
        table.insert(id, value);
    }

    if table.is_empty() {
        return Err(SymshardError::partition(format!("table '{name}' is empty")));
    }
    Ok(table)
}
