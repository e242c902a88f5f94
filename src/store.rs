//! Session-lifetime shard cache with in-flight load deduplication.
//!
//! Each shard id is in one of three states: absent, loading or loaded.
//! The first caller for an absent shard spawns the load as a tokio task and
//! publishes its handle as a [`Shared`] future; every concurrent caller
//! awaits that same future, so at most one fetch per shard is in flight.
//! The task runs to completion even if every caller goes away. Successful
//! loads are cached for the lifetime of the store. Failed loads are
//! forgotten so the next request retries.
//!
//! The slot map is guarded by a `parking_lot` mutex that is never held
//! across an `.await`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ahash::AHashMap;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::ShardLoadError;
use crate::loader::ShardLoader;
use crate::metrics::SearchMetricsCollector;
use crate::shard::record::ShardRecord;

/// Outcome of a shard load, shared by every waiter.
pub type LoadResult = Result<Arc<ShardRecord>, ShardLoadError>;

type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

type SlotMap = AHashMap<String, Slot>;

/// Observable lifecycle state of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardState {
    Absent,
    Loading,
    Loaded,
}

enum Slot {
    Loading { attempt: u64, load: SharedLoad },
    Loaded(Arc<ShardRecord>),
}

/// Owns the mapping from shard id to parsed shard.
pub struct ShardStore {
    loader: Arc<dyn ShardLoader>,
    slots: Arc<Mutex<SlotMap>>,
    next_attempt: AtomicU64,
    load_timeout: Option<Duration>,
    metrics: Arc<SearchMetricsCollector>,
}

impl std::fmt::Debug for ShardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardStore")
            .field("loader", &self.loader)
            .field("loaded", &self.loaded_shards())
            .field("load_timeout", &self.load_timeout)
            .finish()
    }
}

impl ShardStore {
    pub fn new(loader: Arc<dyn ShardLoader>) -> Self {
        Self {
            loader,
            slots: Arc::new(Mutex::new(AHashMap::new())),
            next_attempt: AtomicU64::new(0),
            load_timeout: None,
            metrics: Arc::new(SearchMetricsCollector::new()),
        }
    }

    /// Fail loads that take longer than `timeout`.
    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Record into a shared metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<SearchMetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<SearchMetricsCollector> {
        &self.metrics
    }

    /// Return the shard, loading it if necessary.
    ///
    /// Concurrent calls for the same id share one underlying load and
    /// observe the same record or the same error. Must be called within a
    /// tokio runtime.
    pub async fn ensure_loaded(&self, shard_id: &str) -> LoadResult {
        let load = {
            let mut slots = self.slots.lock();
            match slots.get(shard_id) {
                Some(Slot::Loaded(record)) => {
                    self.metrics.record_cache_hit();
                    return Ok(Arc::clone(record));
                }
                Some(Slot::Loading { load, .. }) => {
                    debug!("joining in-flight load of shard {shard_id}");
                    load.clone()
                }
                None => {
                    let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
                    let load = self.start_load(shard_id, attempt);
                    slots.insert(
                        shard_id.to_string(),
                        Slot::Loading {
                            attempt,
                            load: load.clone(),
                        },
                    );
                    load
                }
            }
        };

        load.await
    }

    /// Load several shards concurrently.
    pub async fn preload<I, S>(&self, shard_ids: I) -> Vec<(String, LoadResult)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = shard_ids.into_iter().map(Into::into).collect();
        let loads = ids.iter().map(|id| self.ensure_loaded(id));
        let outcomes = join_all(loads).await;
        ids.into_iter().zip(outcomes).collect()
    }

    pub fn is_loaded(&self, shard_id: &str) -> bool {
        matches!(self.slots.lock().get(shard_id), Some(Slot::Loaded(_)))
    }

    /// The cached shard, without triggering a load.
    pub fn get(&self, shard_id: &str) -> Option<Arc<ShardRecord>> {
        match self.slots.lock().get(shard_id) {
            Some(Slot::Loaded(record)) => Some(Arc::clone(record)),
            _ => None,
        }
    }

    pub fn state(&self, shard_id: &str) -> ShardState {
        match self.slots.lock().get(shard_id) {
            None => ShardState::Absent,
            Some(Slot::Loading { .. }) => ShardState::Loading,
            Some(Slot::Loaded(_)) => ShardState::Loaded,
        }
    }

    /// Ids of all cached shards, sorted.
    pub fn loaded_shards(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Loaded(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Spawn the load for `attempt` as its own task.
    ///
    /// The task publishes its outcome itself, so a load whose waiters have
    /// all been dropped still completes and is cached.
    fn start_load(&self, shard_id: &str, attempt: u64) -> SharedLoad {
        let loader = Arc::clone(&self.loader);
        let metrics = Arc::clone(&self.metrics);
        let slots = Arc::clone(&self.slots);
        let join_slots = Arc::clone(&self.slots);
        let timeout = self.load_timeout;
        let shard_id = shard_id.to_string();
        let task_shard_id = shard_id.clone();

        let task = tokio::spawn(async move {
            let shard_id = task_shard_id;
            metrics.record_shard_fetch();
            debug!("loading shard {shard_id}");

            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, loader.load(&shard_id))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ShardLoadError::TimedOut {
                            shard_id: shard_id.clone(),
                            millis: limit.as_millis().min(u64::MAX as u128) as u64,
                        })
                    }),
                None => loader.load(&shard_id).await,
            };

            let outcome = match result {
                Ok(record) => {
                    debug!(
                        "loaded shard {shard_id}: {} entries, {} occurrences",
                        record.len(),
                        record.occurrence_count()
                    );
                    Ok(Arc::new(record))
                }
                Err(e) => {
                    metrics.record_load_failure();
                    if e.is_not_found() {
                        debug!("{e}");
                    } else {
                        warn!("{e}");
                    }
                    Err(e)
                }
            };

            settle(&slots, &shard_id, attempt, &outcome);
            outcome
        });

        async move {
            task.await.unwrap_or_else(|e| {
                let outcome = Err(ShardLoadError::transport(
                    shard_id.as_str(),
                    format!("load task failed: {e}"),
                ));
                settle(&join_slots, &shard_id, attempt, &outcome);
                outcome
            })
        }
        .boxed()
        .shared()
    }
}

/// Publish the outcome of `attempt`, unless the slot has since been taken
/// over by a newer attempt.
fn settle(slots: &Mutex<SlotMap>, shard_id: &str, attempt: u64, outcome: &LoadResult) {
    let mut slots = slots.lock();
    let current = matches!(
        slots.get(shard_id),
        Some(Slot::Loading { attempt: a, .. }) if *a == attempt
    );
    if !current {
        return;
    }
    match outcome {
        Ok(record) => {
            slots.insert(shard_id.to_string(), Slot::Loaded(Arc::clone(record)));
        }
        Err(_) => {
            slots.remove(shard_id);
        }
    }
}
