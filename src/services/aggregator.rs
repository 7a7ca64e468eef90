//! Totals aggregation over the full, unfiltered entry set.

use crate::error::LedgerError;
use crate::models::AggregateTotals;
use crate::services::database::EntryStore;
use std::sync::Arc;
use tracing::instrument;

/// Default bound on the unfiltered fetch; keeps the operation finite.
pub const DEFAULT_AGGREGATE_CAP: usize = 1000;

/// Computes running totals independently of any feed pagination or filters,
/// so totals stay correct while the user is scrolled deep into a filtered
/// view. Pure over the fetched set; caching is the caller's concern.
pub struct TotalsAggregator {
    store: Arc<dyn EntryStore>,
    cap: usize,
}

impl TotalsAggregator {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            cap: DEFAULT_AGGREGATE_CAP,
        }
    }

    pub fn with_cap(store: Arc<dyn EntryStore>, cap: usize) -> Self {
        Self { store, cap }
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn compute_totals(&self, owner_id: &str) -> Result<AggregateTotals, LedgerError> {
        let entries = self.store.fetch_all(owner_id, self.cap).await?;
        Ok(AggregateTotals::from_entries(&entries))
    }
}
