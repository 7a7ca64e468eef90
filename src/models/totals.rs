//! Aggregate totals over the full, unfiltered entry set.

use crate::models::{EntryKind, LedgerEntry};
use serde::{Deserialize, Serialize};

/// Running totals in minor currency units. Always derived from a
/// full-collection fetch, never from the paginated/filtered list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateTotals {
    pub income_minor: i64,
    pub expense_minor: i64,
    /// income − expense; may be negative.
    pub balance_minor: i64,
}

impl AggregateTotals {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut income_minor = 0i64;
        let mut expense_minor = 0i64;
        for entry in entries {
            match entry.kind {
                EntryKind::Income => income_minor += entry.amount_minor,
                EntryKind::Expense => expense_minor += entry.amount_minor,
            }
        }
        Self {
            income_minor,
            expense_minor,
            balance_minor: income_minor - expense_minor,
        }
    }
}
