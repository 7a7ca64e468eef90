//! Ledger view controller.
//!
//! The stateful heart of the subsystem: orchestrates the paginated,
//! filtered feed and the always-unfiltered totals aggregate, plus the
//! loading/error flags the presentation layer renders. An explicit,
//! constructed service object; state lives here, not in any ambient global.

use crate::error::{ErrorKind, LedgerError};
use crate::identity::{require_caller, IdentityProvider};
use crate::models::{AggregateTotals, FilterSpec, LedgerEntry, PageCursor};
use crate::services::aggregator::TotalsAggregator;
use crate::services::database::EntryStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Latest operation failure, kept for user display until explicitly
/// cleared or superseded by a fresh operation.
#[derive(Debug, Clone)]
pub struct ViewError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&LedgerError> for ViewError {
    fn from(err: &LedgerError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Read-only copy of the view state for the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    pub entries: Vec<LedgerEntry>,
    pub totals: AggregateTotals,
    pub active_filters: FilterSpec,
    pub has_more: bool,
    pub is_loading: bool,
    pub error: Option<ViewError>,
}

#[derive(Default)]
struct ViewState {
    entries: Vec<LedgerEntry>,
    totals: AggregateTotals,
    active_filters: FilterSpec,
    cursor: Option<PageCursor>,
    has_more: bool,
    is_loading: bool,
    error: Option<ViewError>,
    /// Bumped by every `load`; responses tagged with an older generation
    /// are discarded so a stale `load_more` can never append into a feed
    /// that has since been reset.
    generation: u64,
}

pub struct LedgerView {
    store: Arc<dyn EntryStore>,
    aggregator: TotalsAggregator,
    identity: Arc<dyn IdentityProvider>,
    page_size: usize,
    state: Mutex<ViewState>,
}

impl LedgerView {
    pub fn new(
        store: Arc<dyn EntryStore>,
        aggregator: TotalsAggregator,
        identity: Arc<dyn IdentityProvider>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            aggregator,
            identity,
            page_size,
            state: Mutex::new(ViewState::default()),
        }
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        let state = self.state.lock().await;
        ViewSnapshot {
            entries: state.entries.clone(),
            totals: state.totals,
            active_filters: state.active_filters.clone(),
            has_more: state.has_more,
            is_loading: state.is_loading,
            error: state.error.clone(),
        }
    }

    /// Dismiss the stored error. The presentation layer calls this so a
    /// stale message never survives past the user seeing it.
    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }

    /// Load the first page under `filters` and recompute totals over the
    /// unfiltered set, concurrently. Pagination state is unconditionally
    /// reset; every filter change routes through here.
    #[instrument(skip(self, filters), fields(filters = %filters.signature()))]
    pub async fn load(&self, filters: FilterSpec) -> Result<(), LedgerError> {
        let owner_id = require_caller(self.identity.as_ref())?;

        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.is_loading = true;
            state.error = None;
            state.active_filters = filters.clone();
            state.cursor = None;
            state.generation
        };

        let (page_result, totals_result) = tokio::join!(
            self.store
                .fetch_page(&owner_id, &filters, self.page_size, None),
            self.aggregator.compute_totals(&owner_id),
        );

        let mut state = self.state.lock().await;
        if state.generation != generation {
            // A newer load owns the state now.
            return Ok(());
        }
        state.is_loading = false;

        let mut failure: Option<LedgerError> = None;

        match page_result {
            Ok(page) => {
                state.entries = page.entries;
                state.cursor = page.next_cursor;
                state.has_more = page.has_more;
            }
            Err(e) => {
                // Existing list stays intact on a transient failure.
                state.error = Some(ViewError::from(&e));
                failure = Some(e);
            }
        }

        match totals_result {
            Ok(totals) => state.totals = totals,
            Err(e) => {
                if failure.is_none() {
                    state.error = Some(ViewError::from(&e));
                    failure = Some(e);
                } else {
                    tracing::warn!(error = %e, "Totals recomputation also failed");
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Fetch the next page using the stored cursor and the currently
    /// active filters. A no-op while a load is in flight or when the feed
    /// is exhausted. Results are appended after de-duplicating by entry id,
    /// so concurrent writes between pages never produce duplicates.
    #[instrument(skip(self))]
    pub async fn load_more(&self) -> Result<(), LedgerError> {
        let owner_id = require_caller(self.identity.as_ref())?;

        let (filters, cursor, generation) = {
            let mut state = self.state.lock().await;
            if state.is_loading || !state.has_more {
                return Ok(());
            }
            state.is_loading = true;
            state.error = None;
            (
                state.active_filters.clone(),
                state.cursor.clone(),
                state.generation,
            )
        };

        let result = self
            .store
            .fetch_page(&owner_id, &filters, self.page_size, cursor.as_ref())
            .await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            // A load reset the feed while this page was in flight; the
            // response no longer means anything.
            return Ok(());
        }
        state.is_loading = false;

        match result {
            Ok(page) => {
                let seen: HashSet<String> = state.entries.iter().map(|e| e.id.clone()).collect();
                for entry in page.entries {
                    if !seen.contains(&entry.id) {
                        state.entries.push(entry);
                    }
                }
                if let Some(next) = page.next_cursor {
                    state.cursor = Some(next);
                }
                state.has_more = page.has_more;
                Ok(())
            }
            Err(e) => {
                state.error = Some(ViewError::from(&e));
                Err(e)
            }
        }
    }

    /// Re-run the current feed and totals; invoked after every successful
    /// mutation.
    pub async fn refresh(&self) -> Result<(), LedgerError> {
        let filters = self.state.lock().await.active_filters.clone();
        self.load(filters).await
    }
}
