//! Merging ranked matches into the list handed to the renderer.

use ahash::AHashSet;
use serde::Serialize;

use crate::query::engine::SymbolMatch;

/// Final, display-ready result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedResults {
    /// Matches in engine order, deduplicated and capped.
    pub results: Vec<SymbolMatch>,

    /// More matches existed than fit in the capacity.
    pub truncated: bool,

    /// Distinct matches before capping.
    pub total_matches: usize,

    /// Matches dropped because an earlier one had the same target.
    pub duplicates_removed: usize,
}

impl AggregatedResults {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

/// Deduplicates by target and truncates to a display budget.
#[derive(Debug, Clone, Copy)]
pub struct ResultAggregator {
    capacity: usize,
}

impl ResultAggregator {
    /// `capacity` of zero means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Aggregate with this aggregator's capacity.
    pub fn aggregate(&self, raw: Vec<SymbolMatch>) -> AggregatedResults {
        aggregate(raw, self.capacity)
    }
}

/// Drop matches whose target was already seen, then keep the first
/// `capacity`, preserving order.
pub fn aggregate(raw: Vec<SymbolMatch>, capacity: usize) -> AggregatedResults {
    let mut seen = AHashSet::with_capacity(raw.len());
    let mut unique = Vec::with_capacity(raw.len());
    let mut duplicates_removed = 0;

    for candidate in raw {
        if seen.insert(candidate.occurrence.target.clone()) {
            unique.push(candidate);
        } else {
            duplicates_removed += 1;
        }
    }

    let total_matches = unique.len();
    let truncated = capacity > 0 && total_matches > capacity;
    if truncated {
        unique.truncate(capacity);
    }

    AggregatedResults {
        results: unique,
        truncated,
        total_matches,
        duplicates_removed,
    }
}
