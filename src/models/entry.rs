//! Ledger entry model.

use crate::error::LedgerError;
use crate::models::Attachment;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Whether an entry adds to or subtracts from the balance. The amount
/// itself is always non-negative; sign is carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    /// Get string representation for database filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One income/expense record as stored in the backend collection.
///
/// `id`, `created_at` and `updated_at` are assigned by the backend on insert
/// and never client-trusted; a record without an id is an [`EntryDraft`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub occurred_on: NaiveDate,
    pub kind: EntryKind,
    /// Non-negative amount in minor currency units. Never floating point.
    pub amount_minor: i64,
    pub category_id: String,
    pub payment_method_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Creation payload. The backend assigns identifier and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDraft {
    pub occurred_on: NaiveDate,
    pub kind: EntryKind,
    pub amount_minor: i64,
    pub category_id: String,
    pub payment_method_id: String,
    pub funding_source_id: Option<String>,
    pub note: Option<String>,
}

impl EntryDraft {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount_minor < 0 {
            return Err(LedgerError::Validation(anyhow::anyhow!(
                "amount must be non-negative (sign is carried by kind)"
            )));
        }
        if self.category_id.is_empty() {
            return Err(LedgerError::Validation(anyhow::anyhow!(
                "category id must not be empty"
            )));
        }
        if self.payment_method_id.is_empty() {
            return Err(LedgerError::Validation(anyhow::anyhow!(
                "payment method id must not be empty"
            )));
        }
        Ok(())
    }
}

/// Attachment change carried by a partial update. `Remove` must clear the
/// field server-side, not merely omit it.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentChange {
    Set(Attachment),
    Remove,
}

/// Partial merge applied to an existing entry; `None` fields are left as is.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub occurred_on: Option<NaiveDate>,
    pub kind: Option<EntryKind>,
    pub amount_minor: Option<i64>,
    pub category_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub funding_source_id: Option<String>,
    pub note: Option<String>,
    pub attachment: Option<AttachmentChange>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.occurred_on.is_none()
            && self.kind.is_none()
            && self.amount_minor.is_none()
            && self.category_id.is_none()
            && self.payment_method_id.is_none()
            && self.funding_source_id.is_none()
            && self.note.is_none()
            && self.attachment.is_none()
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if let Some(amount) = self.amount_minor {
            if amount < 0 {
                return Err(LedgerError::Validation(anyhow::anyhow!(
                    "amount must be non-negative (sign is carried by kind)"
                )));
            }
        }
        if self.is_empty() {
            return Err(LedgerError::Validation(anyhow::anyhow!(
                "patch must change at least one field"
            )));
        }
        Ok(())
    }
}
