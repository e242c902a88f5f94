//! Counters for query and shard-load activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Point-in-time view of the collected metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMetrics {
    /// Queries handed to the engine.
    pub queries_issued: u64,

    /// Queries that produced a result set.
    pub queries_completed: u64,

    /// Queries discarded because a newer query was issued.
    pub queries_superseded: u64,

    /// Queries below the minimum length (answered empty, no shard touched).
    pub queries_too_short: u64,

    /// Underlying shard fetches started.
    pub shard_fetches: u64,

    /// Shard requests satisfied from the cache.
    pub cache_hits: u64,

    /// Shard loads that failed.
    pub load_failures: u64,

    pub avg_query_time: Duration,
    pub max_query_time: Duration,
    pub min_query_time: Duration,
}

/// Lock-free collector shared by the store and the engine.
#[derive(Debug)]
pub struct SearchMetricsCollector {
    queries_issued: AtomicU64,
    queries_completed: AtomicU64,
    queries_superseded: AtomicU64,
    queries_too_short: AtomicU64,
    shard_fetches: AtomicU64,
    cache_hits: AtomicU64,
    load_failures: AtomicU64,
    total_query_nanos: AtomicU64,
    max_query_nanos: AtomicU64,
    min_query_nanos: AtomicU64,
    start_time: Instant,
}

impl SearchMetricsCollector {
    pub fn new() -> Self {
        Self {
            queries_issued: AtomicU64::new(0),
            queries_completed: AtomicU64::new(0),
            queries_superseded: AtomicU64::new(0),
            queries_too_short: AtomicU64::new(0),
            shard_fetches: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            total_query_nanos: AtomicU64::new(0),
            max_query_nanos: AtomicU64::new(0),
            min_query_nanos: AtomicU64::new(u64::MAX),
            start_time: Instant::now(),
        }
    }

    pub fn record_query_issued(&self) {
        self.queries_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed query and its wall time.
    pub fn record_query_completed(&self, elapsed: Duration) {
        self.queries_completed.fetch_add(1, Ordering::Relaxed);

        let nanos = elapsed.as_nanos().min(u64::MAX as u128) as u64;
        self.total_query_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_query_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.min_query_nanos.fetch_min(nanos, Ordering::Relaxed);
    }

    pub fn record_query_superseded(&self) {
        self.queries_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query_too_short(&self) {
        self.queries_too_short.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shard_fetch(&self) {
        self.shard_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current metrics snapshot.
    pub fn snapshot(&self) -> SearchMetrics {
        let completed = self.queries_completed.load(Ordering::Relaxed);
        let total_nanos = self.total_query_nanos.load(Ordering::Relaxed);
        let avg_nanos = if completed > 0 {
            total_nanos / completed
        } else {
            0
        };

        let min_nanos = self.min_query_nanos.load(Ordering::Relaxed);
        let min_query_time = if min_nanos == u64::MAX {
            Duration::ZERO
        } else {
            Duration::from_nanos(min_nanos)
        };

        SearchMetrics {
            queries_issued: self.queries_issued.load(Ordering::Relaxed),
            queries_completed: completed,
            queries_superseded: self.queries_superseded.load(Ordering::Relaxed),
            queries_too_short: self.queries_too_short.load(Ordering::Relaxed),
            shard_fetches: self.shard_fetches.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            avg_query_time: Duration::from_nanos(avg_nanos),
            max_query_time: Duration::from_nanos(self.max_query_nanos.load(Ordering::Relaxed)),
            min_query_time,
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        for counter in [
            &self.queries_issued,
            &self.queries_completed,
            &self.queries_superseded,
            &self.queries_too_short,
            &self.shard_fetches,
            &self.cache_hits,
            &self.load_failures,
            &self.total_query_nanos,
            &self.max_query_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.min_query_nanos.store(u64::MAX, Ordering::Relaxed);
    }

    /// Get the uptime of this collector.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for SearchMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let collector = SearchMetricsCollector::new();

        collector.record_query_issued();
        collector.record_query_issued();
        collector.record_query_issued();
        collector.record_query_completed(Duration::from_millis(4));
        collector.record_query_completed(Duration::from_millis(2));
        collector.record_query_superseded();
        collector.record_shard_fetch();
        collector.record_cache_hit();
        collector.record_cache_hit();
        collector.record_load_failure();

        let metrics = collector.snapshot();
        assert_eq!(metrics.queries_issued, 3);
        assert_eq!(metrics.queries_completed, 2);
        assert_eq!(metrics.queries_superseded, 1);
        assert_eq!(metrics.shard_fetches, 1);
        assert_eq!(metrics.cache_hits, 2);
        assert_eq!(metrics.load_failures, 1);
        assert_eq!(metrics.min_query_time, Duration::from_millis(2));
        assert_eq!(metrics.max_query_time, Duration::from_millis(4));
        assert_eq!(metrics.avg_query_time, Duration::from_millis(3));
    }

    #[test]
    fn test_reset() {
        let collector = SearchMetricsCollector::new();
        collector.record_query_too_short();
        collector.record_query_completed(Duration::from_millis(1));
        collector.reset();

        let metrics = collector.snapshot();
        assert_eq!(metrics.queries_too_short, 0);
        assert_eq!(metrics.queries_completed, 0);
        assert_eq!(metrics.min_query_time, Duration::ZERO);
    }
}
