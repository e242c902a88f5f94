//! Incremental prefix search over lazily loaded shards.
//!
//! Every call to [`QueryEngine::search`] is stamped with a monotonically
//! increasing sequence number. Shard loads are the only suspension point;
//! when they finish, a call whose sequence is no longer the latest is
//! reported as [`QueryOutcome::Superseded`] instead of producing results.
//! The loads themselves still complete and stay cached.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use futures::future::join_all;
use log::{debug, warn};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{Result, ShardLoadError, SymshardError};
use crate::query::config::SearchConfig;
use crate::query::normalize::{char_len, label_matches, normalize_query};
use crate::shard::partition::Partitioner;
use crate::shard::record::{Occurrence, ShardRecord};
use crate::store::ShardStore;

/// One occurrence of a symbol whose label matched the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolMatch {
    /// Label as emitted by the generator.
    pub label: String,

    /// Label with HTML entities decoded.
    pub display_label: String,

    /// Entry key within the owning shard.
    pub key: String,

    pub shard_id: String,

    pub occurrence: Occurrence,

    /// Position in scan order; the final ranking tie-break.
    pub emission: usize,
}

/// Result of a query that was still current when its shards arrived.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResults {
    pub sequence: u64,

    /// The normalized query text.
    pub query: String,

    /// Shards consulted, in scan order.
    pub candidates: Vec<String>,

    /// Ranked matches.
    pub matches: Vec<SymbolMatch>,

    /// Candidate shards that could not be loaded.
    #[serde(skip)]
    pub failures: Vec<ShardLoadError>,
}

impl QueryResults {
    fn empty(sequence: u64, query: String) -> Self {
        Self {
            sequence,
            query,
            candidates: Vec::new(),
            matches: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Some candidate shard failed; results come from the healthy ones.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Every candidate failed for a reason other than the shard simply not
    /// existing.
    pub fn is_unavailable(&self) -> bool {
        !self.candidates.is_empty()
            && self.failures.len() == self.candidates.len()
            && self.failures.iter().all(|e| !e.is_not_found())
    }
}

/// What a call to [`QueryEngine::search`] produced.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Completed(QueryResults),

    /// A newer query was issued while this one waited for shards.
    Superseded { sequence: u64 },
}

impl QueryOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            QueryOutcome::Completed(results) => results.sequence,
            QueryOutcome::Superseded { sequence } => *sequence,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, QueryOutcome::Superseded { .. })
    }

    pub fn into_results(self) -> Option<QueryResults> {
        match self {
            QueryOutcome::Completed(results) => Some(results),
            QueryOutcome::Superseded { .. } => None,
        }
    }
}

/// Resolves queries to shards, loads them and scans for prefix matches.
#[derive(Debug)]
pub struct QueryEngine {
    config: SearchConfig,
    sections: RwLock<Vec<String>>,
    partitioner: Arc<dyn Partitioner>,
    store: Arc<ShardStore>,
    latest: AtomicU64,
}

impl QueryEngine {
    pub fn new(
        config: SearchConfig,
        partitioner: Arc<dyn Partitioner>,
        store: Arc<ShardStore>,
    ) -> Result<Self> {
        config.validate()?;
        check_sections(partitioner.as_ref(), &config.sections)?;

        Ok(Self {
            sections: RwLock::new(config.sections.clone()),
            config,
            partitioner,
            store,
            latest: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ShardStore> {
        &self.store
    }

    pub fn partitioner(&self) -> &Arc<dyn Partitioner> {
        &self.partitioner
    }

    /// Sections currently searched.
    pub fn sections(&self) -> Vec<String> {
        self.sections.read().clone()
    }

    /// Switch the searched sections. Unknown names are rejected and leave
    /// the current selection untouched.
    pub fn set_sections<I, S>(&self, sections: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sections: Vec<String> = sections.into_iter().map(Into::into).collect();
        if sections.is_empty() {
            return Err(SymshardError::invalid_config(
                "at least one section must be searched",
            ));
        }
        check_sections(self.partitioner.as_ref(), &sections)?;
        *self.sections.write() = sections;
        Ok(())
    }

    /// Sequence number of the most recently issued query.
    pub fn latest_sequence(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_superseded(&self, sequence: u64) -> bool {
        self.latest_sequence() != sequence
    }

    /// Candidate shards for an already-normalized query, in scan order.
    pub fn candidates(&self, normalized_query: &str) -> Vec<String> {
        let mut shards: Vec<String> = Vec::new();
        for section in self.sections.read().iter() {
            for shard in self.partitioner.candidates(section, normalized_query) {
                if !shards.contains(&shard) {
                    shards.push(shard);
                }
            }
        }
        shards
    }

    /// Run a query, loading candidate shards as needed.
    pub async fn search(&self, text: &str) -> QueryOutcome {
        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let metrics = Arc::clone(self.store.metrics());
        metrics.record_query_issued();

        let started = Instant::now();
        let query = normalize_query(text);

        if char_len(&query) < self.config.min_query_len {
            metrics.record_query_too_short();
            return QueryOutcome::Completed(QueryResults::empty(sequence, query));
        }

        let candidates = self.candidates(&query);
        let loads = candidates
            .iter()
            .map(|shard_id| self.store.ensure_loaded(shard_id));
        let outcomes = join_all(loads).await;

        if self.is_superseded(sequence) {
            metrics.record_query_superseded();
            debug!("query #{sequence} '{query}' superseded");
            return QueryOutcome::Superseded { sequence };
        }

        let mut shards = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(record) => shards.push(record),
                Err(e) => failures.push(e),
            }
        }
        if !failures.is_empty() {
            warn!(
                "query '{query}' searched {} of {} shards",
                shards.len(),
                candidates.len()
            );
        }

        let matches = scan(&query, &shards);
        metrics.record_query_completed(started.elapsed());
        debug!(
            "query #{sequence} '{query}': {} matches from {:?}",
            matches.len(),
            candidates
        );

        QueryOutcome::Completed(QueryResults {
            sequence,
            query,
            candidates,
            matches,
            failures,
        })
    }

    /// Scan only the candidate shards that are already cached.
    ///
    /// Never suspends and never starts a load; does not take part in
    /// sequencing.
    pub fn search_loaded(&self, text: &str) -> Vec<SymbolMatch> {
        let query = normalize_query(text);
        if char_len(&query) < self.config.min_query_len {
            return Vec::new();
        }
        let shards: Vec<Arc<ShardRecord>> = self
            .candidates(&query)
            .iter()
            .filter_map(|shard_id| self.store.get(shard_id))
            .collect();
        scan(&query, &shards)
    }
}

fn check_sections(partitioner: &dyn Partitioner, sections: &[String]) -> Result<()> {
    for section in sections {
        if !partitioner.has_section(section) {
            return Err(SymshardError::invalid_config(format!(
                "unknown section '{section}' (partitioner: {})",
                partitioner.description()
            )));
        }
    }
    Ok(())
}

/// Collect every occurrence of every entry whose label starts with the
/// query, then rank.
pub fn scan(normalized_query: &str, shards: &[Arc<ShardRecord>]) -> Vec<SymbolMatch> {
    let mut matches = Vec::new();
    let mut emission = 0;

    for shard in shards {
        for entry in shard.entries() {
            if !label_matches(entry, normalized_query) {
                continue;
            }
            let display_label = entry.display_label().into_owned();
            for occurrence in &entry.occurrences {
                matches.push(SymbolMatch {
                    label: entry.label.clone(),
                    display_label: display_label.clone(),
                    key: entry.key.clone(),
                    shard_id: shard.shard_id().to_string(),
                    occurrence: occurrence.clone(),
                    emission,
                });
                emission += 1;
            }
        }
    }

    rank(&mut matches);
    matches
}

/// Shorter labels first, then label order, then scan order.
pub fn rank(matches: &mut [SymbolMatch]) {
    matches.sort_by(compare_matches);
}

fn compare_matches(a: &SymbolMatch, b: &SymbolMatch) -> CmpOrdering {
    char_len(&a.display_label)
        .cmp(&char_len(&b.display_label))
        .then_with(|| a.display_label.cmp(&b.display_label))
        .then_with(|| a.emission.cmp(&b.emission))
}
