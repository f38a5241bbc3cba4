//! Debounced terminology search for type-ahead clients.
//!
//! Each call waits out the quiet period and then runs the search only if no newer call has been
//! made in the meantime. Superseded calls resolve to `None`.

use crate::config::CoreConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use terminology::{ConceptEntry, ConceptTables};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct SearchDebouncer {
    tables: Arc<ConceptTables>,
    delay: Duration,
    min_chars: usize,
    latest: AtomicU64,
}

impl SearchDebouncer {
    pub fn new(tables: Arc<ConceptTables>, delay: Duration, min_chars: usize) -> Self {
        Self {
            tables,
            delay,
            min_chars,
            latest: AtomicU64::new(0),
        }
    }

    pub fn from_config(tables: Arc<ConceptTables>, cfg: &CoreConfig) -> Self {
        Self::new(tables, cfg.search_debounce(), cfg.search_min_chars())
    }

    /// Search after the quiet period.
    ///
    /// Returns `None` if a newer call was made while this one was waiting. Queries shorter than
    /// the minimum length return an empty result at once (and still supersede pending calls).
    pub async fn search(&self, query: &str) -> Option<Vec<ConceptEntry>> {
        let ticket = self.next_ticket();
        self.settle(ticket, query).await
    }

    /// Spawn a debounced search.
    ///
    /// The call is ordered against other calls here, not when the task first runs, so a line of
    /// spawned searches supersedes in the order it was issued.
    pub fn spawn_search(self: &Arc<Self>, query: String) -> JoinHandle<Option<Vec<ConceptEntry>>> {
        let ticket = self.next_ticket();
        let this = Arc::clone(self);
        tokio::spawn(async move { this.settle(ticket, &query).await })
    }

    fn next_ticket(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn settle(&self, ticket: u64, query: &str) -> Option<Vec<ConceptEntry>> {
        if query.trim().chars().count() < self.min_chars {
            return Some(Vec::new());
        }

        tokio::time::sleep(self.delay).await;

        if self.latest.load(Ordering::SeqCst) != ticket {
            tracing::debug!(query, "search superseded");
            return None;
        }

        Some(self.tables.search(query).into_iter().cloned().collect())
    }
}
