//! Glue between the search box, the engine and the result renderer.
//!
//! A [`SearchSession`] receives raw input through
//! [`on_query_input`](SearchSession::on_query_input), runs it through the
//! [`QueryEngine`] and the [`ResultAggregator`], and hands the outcome to a
//! [`ResultRenderer`]. Delivery is monotonic: once results for query `n`
//! have been displayed, nothing from a query older than `n` ever reaches the
//! renderer.

use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;

use crate::aggregator::ResultAggregator;
use crate::error::Result;
use crate::query::engine::{QueryEngine, QueryOutcome, SymbolMatch};

/// Receives result lists for display.
pub trait ResultRenderer: Send + Sync {
    /// Show `results`; `truncated` means more matches exist.
    fn display(&self, results: &[SymbolMatch], truncated: bool);

    /// The index could not be reached at all for the current query.
    fn search_unavailable(&self) {}
}

/// What happened to one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Displayed {
        sequence: u64,
        shown: usize,
        truncated: bool,
    },
    Unavailable {
        sequence: u64,
    },
    /// A newer query overtook this one; nothing was rendered.
    Superseded {
        sequence: u64,
    },
}

pub struct SearchSession<R: ResultRenderer> {
    engine: Arc<QueryEngine>,
    aggregator: ResultAggregator,
    renderer: R,
    last_delivered: Mutex<u64>,
}

impl<R: ResultRenderer> SearchSession<R> {
    pub fn new(engine: Arc<QueryEngine>, renderer: R) -> Self {
        let aggregator = ResultAggregator::new(engine.config().capacity);
        Self {
            engine,
            aggregator,
            renderer,
            last_delivered: Mutex::new(0),
        }
    }

    pub fn engine(&self) -> &Arc<QueryEngine> {
        &self.engine
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Sequence number of the last query whose results were rendered.
    pub fn last_delivered(&self) -> u64 {
        *self.last_delivered.lock()
    }

    /// Change the searched index sections (the category selector).
    pub fn select_sections<I, S>(&self, sections: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engine.set_sections(sections)?;
        info!("searching sections {:?}", self.engine.sections());
        Ok(())
    }

    /// Handle one input event from the search box.
    pub async fn on_query_input(&self, text: &str) -> Delivery {
        let results = match self.engine.search(text).await {
            QueryOutcome::Completed(results) => results,
            QueryOutcome::Superseded { sequence } => return Delivery::Superseded { sequence },
        };
        let sequence = results.sequence;
        let unavailable = results.is_unavailable();
        let aggregated = self.aggregator.aggregate(results.matches);

        {
            let mut last = self.last_delivered.lock();
            if sequence <= *last || self.engine.is_superseded(sequence) {
                return Delivery::Superseded { sequence };
            }
            *last = sequence;
        }

        if unavailable {
            warn!("search unavailable for query #{sequence}");
            self.renderer.search_unavailable();
            return Delivery::Unavailable { sequence };
        }

        self.renderer
            .display(&aggregated.results, aggregated.truncated);
        Delivery::Displayed {
            sequence,
            shown: aggregated.results.len(),
            truncated: aggregated.truncated,
        }
    }
}
