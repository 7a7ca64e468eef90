//! Binary attachment descriptor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved path segment marking a staged (not yet committed) object.
///
/// A receipt is uploaded before its owning entry has a permanent identifier,
/// so the staged key is namespaced by a placeholder id under this segment.
/// The segment must never appear in the key of a committed entry's
/// attachment.
pub const STAGING_SEGMENT: &str = "staging";

/// Descriptor of a binary object (receipt image or document) bound to a
/// ledger entry. An entry has at most one attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Object-store key; staged keys carry the [`STAGING_SEGMENT`].
    pub storage_key: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub uploaded_at: DateTime<Utc>,
}

impl Attachment {
    /// True when the key still points at the temporary staging location.
    pub fn is_staged(&self) -> bool {
        self.storage_key
            .split('/')
            .any(|segment| segment == STAGING_SEGMENT)
    }
}
