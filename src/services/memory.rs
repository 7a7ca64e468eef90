//! In-process [`EntryStore`] backend.
//!
//! Implements the same contract as the MongoDB store over a mutex-guarded
//! vector. Used by the integration tests and the ephemeral storage backend;
//! the pagination, ordering and merge semantics must stay aligned with
//! [`MongoEntryStore`](crate::services::MongoEntryStore).

use crate::error::LedgerError;
use crate::models::{
    AttachmentChange, EntryDraft, EntryPage, EntryPatch, FilterSpec, LedgerEntry, PageCursor,
};
use crate::services::database::EntryStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryEntryStore {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed order: occurrence date descending, id descending as tiebreak.
    fn feed_order(a: &LedgerEntry, b: &LedgerEntry) -> std::cmp::Ordering {
        b.occurred_on
            .cmp(&a.occurred_on)
            .then_with(|| b.id.cmp(&a.id))
    }

    /// True when `entry` sorts strictly after the cursor position.
    fn after_cursor(entry: &LedgerEntry, cursor: &PageCursor) -> bool {
        entry.occurred_on < cursor.occurred_on
            || (entry.occurred_on == cursor.occurred_on && entry.id < cursor.entry_id)
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn fetch_page(
        &self,
        owner_id: &str,
        filters: &FilterSpec,
        page_size: usize,
        cursor: Option<&PageCursor>,
    ) -> Result<EntryPage, LedgerError> {
        if page_size == 0 {
            return Err(LedgerError::Validation(anyhow::anyhow!(
                "page size must be at least 1"
            )));
        }

        let guard = self.entries.lock().await;
        let mut matching: Vec<LedgerEntry> = guard
            .iter()
            .filter(|e| e.owner_id == owner_id && filters.matches(e))
            .cloned()
            .collect();
        drop(guard);

        matching.sort_by(Self::feed_order);

        let entries: Vec<LedgerEntry> = matching
            .into_iter()
            .filter(|e| cursor.map_or(true, |c| Self::after_cursor(e, c)))
            .take(page_size)
            .collect();

        let has_more = entries.len() == page_size;
        let next_cursor = entries.last().map(PageCursor::from_entry);

        Ok(EntryPage {
            entries,
            next_cursor,
            has_more,
        })
    }

    async fn fetch_all(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let guard = self.entries.lock().await;
        let mut entries: Vec<LedgerEntry> = guard
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        drop(guard);

        entries.sort_by(Self::feed_order);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn get(
        &self,
        owner_id: &str,
        entry_id: &str,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let guard = self.entries.lock().await;
        Ok(guard
            .iter()
            .find(|e| e.owner_id == owner_id && e.id == entry_id)
            .cloned())
    }

    async fn insert(&self, owner_id: &str, draft: &EntryDraft) -> Result<LedgerEntry, LedgerError> {
        let now = Utc::now();
        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            occurred_on: draft.occurred_on,
            kind: draft.kind,
            amount_minor: draft.amount_minor,
            category_id: draft.category_id.clone(),
            payment_method_id: draft.payment_method_id.clone(),
            funding_source_id: draft.funding_source_id.clone(),
            note: draft.note.clone(),
            attachment: None,
            created_at: now,
            updated_at: now,
        };

        self.entries.lock().await.push(entry.clone());
        Ok(entry)
    }

    async fn update(
        &self,
        owner_id: &str,
        entry_id: &str,
        patch: &EntryPatch,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut guard = self.entries.lock().await;
        let entry = guard
            .iter_mut()
            .find(|e| e.owner_id == owner_id && e.id == entry_id)
            .ok_or_else(|| LedgerError::NotFound(anyhow::anyhow!("entry {} not found", entry_id)))?;

        if let Some(occurred_on) = patch.occurred_on {
            entry.occurred_on = occurred_on;
        }
        if let Some(kind) = patch.kind {
            entry.kind = kind;
        }
        if let Some(amount_minor) = patch.amount_minor {
            entry.amount_minor = amount_minor;
        }
        if let Some(ref category_id) = patch.category_id {
            entry.category_id = category_id.clone();
        }
        if let Some(ref payment_method_id) = patch.payment_method_id {
            entry.payment_method_id = payment_method_id.clone();
        }
        if let Some(ref funding_source_id) = patch.funding_source_id {
            entry.funding_source_id = Some(funding_source_id.clone());
        }
        if let Some(ref note) = patch.note {
            entry.note = Some(note.clone());
        }
        match patch.attachment {
            Some(AttachmentChange::Set(ref attachment)) => {
                entry.attachment = Some(attachment.clone());
            }
            Some(AttachmentChange::Remove) => {
                entry.attachment = None;
            }
            None => {}
        }
        entry.updated_at = Utc::now();

        Ok(entry.clone())
    }

    async fn delete(&self, owner_id: &str, entry_id: &str) -> Result<(), LedgerError> {
        let mut guard = self.entries.lock().await;
        let before = guard.len();
        guard.retain(|e| !(e.owner_id == owner_id && e.id == entry_id));
        if guard.len() == before {
            return Err(LedgerError::NotFound(anyhow::anyhow!(
                "entry {} not found",
                entry_id
            )));
        }
        Ok(())
    }
}
