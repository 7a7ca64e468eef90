//! Feed filtering and cursor pagination types.

use crate::models::{EntryKind, LedgerEntry};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Predicates narrowing the paginated feed. An absent field means "no
/// constraint". Equality between two specs decides whether pagination state
/// must reset, so the derive matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: Option<EntryKind>,
    pub category_id: Option<String>,
    pub funding_source_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterSpec {
    pub fn is_unconstrained(&self) -> bool {
        *self == FilterSpec::default()
    }

    /// Evaluate the predicates against one entry, in the same fixed order
    /// the remote query applies them: kind, category, funding source, start
    /// date, end date.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(kind) = self.kind {
            if entry.kind != kind {
                return false;
            }
        }
        if let Some(ref category_id) = self.category_id {
            if entry.category_id != *category_id {
                return false;
            }
        }
        if let Some(ref funding_source_id) = self.funding_source_id {
            if entry.funding_source_id.as_deref() != Some(funding_source_id.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if entry.occurred_on < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if entry.occurred_on > to {
                return false;
            }
        }
        true
    }

    /// Deterministic signature of the composed predicates, in application
    /// order. Two equal specs always produce the same signature, which keeps
    /// composed queries stable and cacheable.
    pub fn signature(&self) -> String {
        let mut parts = Vec::new();
        if let Some(kind) = self.kind {
            parts.push(format!("kind={}", kind));
        }
        if let Some(ref category_id) = self.category_id {
            parts.push(format!("category={}", category_id));
        }
        if let Some(ref funding_source_id) = self.funding_source_id {
            parts.push(format!("funding={}", funding_source_id));
        }
        if let Some(from) = self.date_from {
            parts.push(format!("from={}", from));
        }
        if let Some(to) = self.date_to {
            parts.push(format!("to={}", to));
        }
        if parts.is_empty() {
            "unfiltered".to_string()
        } else {
            parts.join(",")
        }
    }
}

/// Opaque continuation token referencing the last entry of the previous
/// page. `None` at the call site means "start of feed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub occurred_on: NaiveDate,
    pub entry_id: String,
}

impl PageCursor {
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        Self {
            occurred_on: entry.occurred_on,
            entry_id: entry.id.clone(),
        }
    }
}

/// One page of feed results.
#[derive(Debug, Clone)]
pub struct EntryPage {
    pub entries: Vec<LedgerEntry>,
    pub next_cursor: Option<PageCursor>,
    /// Heuristic: true iff the page came back full. A feed whose size is an
    /// exact multiple of the page size costs one extra, empty fetch.
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_and_ordered() {
        let spec = FilterSpec {
            date_to: Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            kind: Some(EntryKind::Expense),
            category_id: Some("rent".to_string()),
            ..Default::default()
        };
        assert_eq!(spec.signature(), "kind=expense,category=rent,to=2024-12-31");
        assert_eq!(spec.signature(), spec.clone().signature());
    }

    #[test]
    fn default_spec_is_unconstrained() {
        assert!(FilterSpec::default().is_unconstrained());
        assert_eq!(FilterSpec::default().signature(), "unfiltered");
    }
}
