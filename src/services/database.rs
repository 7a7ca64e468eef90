//! Remote collection accessor.
//!
//! [`EntryStore`] is the boundary between the subsystem and the backend
//! document collection: filtered, ordered, cursor-paginated queries plus
//! insert/partial-update/delete, all namespaced by the caller identity.
//! Driver errors are translated into the [`LedgerError`] taxonomy here and
//! never cross this boundary raw.

use crate::error::LedgerError;
use crate::models::{
    AttachmentChange, EntryDraft, EntryPage, EntryPatch, FilterSpec, LedgerEntry, PageCursor,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Client as MongoClient, Collection, Database, IndexModel};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Fetch one page of the feed, newest first.
    ///
    /// `has_more` is inferred structurally: true iff exactly `page_size`
    /// entries came back. A full page implies more may exist; a feed whose
    /// size is an exact multiple of the page size costs one extra, empty
    /// fetch. This is a documented approximation, not an exact count.
    async fn fetch_page(
        &self,
        owner_id: &str,
        filters: &FilterSpec,
        page_size: usize,
        cursor: Option<&PageCursor>,
    ) -> Result<EntryPage, LedgerError>;

    /// Fetch the full entry set, bypassing filters, up to `limit` entries in
    /// the same order as the feed. Used by the totals aggregator.
    async fn fetch_all(&self, owner_id: &str, limit: usize) -> Result<Vec<LedgerEntry>, LedgerError>;

    async fn get(&self, owner_id: &str, entry_id: &str)
        -> Result<Option<LedgerEntry>, LedgerError>;

    /// Insert a draft; the store assigns the identifier and both timestamps.
    async fn insert(&self, owner_id: &str, draft: &EntryDraft) -> Result<LedgerEntry, LedgerError>;

    /// Apply a partial merge and return the post-image. An explicit
    /// attachment `Remove` clears the field server-side.
    async fn update(
        &self,
        owner_id: &str,
        entry_id: &str,
        patch: &EntryPatch,
    ) -> Result<LedgerEntry, LedgerError>;

    /// Terminal, irreversible removal. Deleting a missing entry is
    /// `NotFound`; callers that want idempotence handle that kind.
    async fn delete(&self, owner_id: &str, entry_id: &str) -> Result<(), LedgerError>;
}

/// [`EntryStore`] over a MongoDB collection.
#[derive(Clone)]
pub struct MongoEntryStore {
    client: MongoClient,
    db: Database,
}

impl MongoEntryStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, LedgerError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            LedgerError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), LedgerError> {
        let entries = self.entries();

        // Compound index matching the feed sort so cursor continuation
        // stays an index scan.
        let feed_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "occurred_on": -1, "_id": -1 })
            .options(IndexOptions::builder().name("feed_order".to_string()).build())
            .build();

        entries.create_index(feed_index, None).await.map_err(|e| {
            tracing::error!("Failed to create feed_order index on entries: {}", e);
            LedgerError::from(e)
        })?;
        tracing::info!("Created index on entries.(owner_id, occurred_on, _id)");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), LedgerError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                LedgerError::from(e)
            })?;
        Ok(())
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    fn entries(&self) -> Collection<LedgerEntry> {
        self.db.collection("entries")
    }

    /// Build the query document. Predicates are applied in a fixed order
    /// (kind, category, funding source, start date, end date) so composed
    /// queries have a stable signature.
    fn filter_doc(owner_id: &str, filters: &FilterSpec) -> Document {
        let mut filter = doc! { "owner_id": owner_id };
        if let Some(kind) = filters.kind {
            filter.insert("kind", kind.as_str());
        }
        if let Some(ref category_id) = filters.category_id {
            filter.insert("category_id", category_id.as_str());
        }
        if let Some(ref funding_source_id) = filters.funding_source_id {
            filter.insert("funding_source_id", funding_source_id.as_str());
        }
        let mut range = Document::new();
        if let Some(from) = filters.date_from {
            range.insert("$gte", from.to_string());
        }
        if let Some(to) = filters.date_to {
            range.insert("$lte", to.to_string());
        }
        if !range.is_empty() {
            filter.insert("occurred_on", range);
        }
        filter
    }

    /// Continuation predicate: strictly after the cursor entry in
    /// (occurred_on desc, _id desc) order.
    fn after_cursor(filter: Document, cursor: &PageCursor) -> Document {
        let date = cursor.occurred_on.to_string();
        doc! {
            "$and": [
                filter,
                { "$or": [
                    { "occurred_on": { "$lt": &date } },
                    { "occurred_on": &date, "_id": { "$lt": &cursor.entry_id } },
                ] },
            ]
        }
    }

    fn feed_sort() -> Document {
        doc! { "occurred_on": -1, "_id": -1 }
    }
}

#[async_trait]
impl EntryStore for MongoEntryStore {
    #[instrument(skip(self, filters, cursor), fields(owner_id = %owner_id, filters = %filters.signature()))]
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
        let started = Instant::now();

        let mut filter = Self::filter_doc(owner_id, filters);
        if let Some(cursor) = cursor {
            filter = Self::after_cursor(filter, cursor);
        }

        let options = FindOptions::builder()
            .sort(Self::feed_sort())
            .limit(page_size as i64)
            .build();

        let mut db_cursor = self.entries().find(filter, options).await?;
        let mut entries = Vec::with_capacity(page_size);
        while let Some(entry) = db_cursor.try_next().await? {
            entries.push(entry);
        }

        let has_more = entries.len() == page_size;
        let next_cursor = entries.last().map(PageCursor::from_entry);

        metrics::counter!("ledger_fetch_pages_total").increment(1);
        metrics::histogram!("ledger_store_duration_seconds", "op" => "fetch_page")
            .record(started.elapsed().as_secs_f64());

        Ok(EntryPage {
            entries,
            next_cursor,
            has_more,
        })
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, limit = limit))]
    async fn fetch_all(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let started = Instant::now();

        let options = FindOptions::builder()
            .sort(Self::feed_sort())
            .limit(limit as i64)
            .build();

        let mut db_cursor = self
            .entries()
            .find(doc! { "owner_id": owner_id }, options)
            .await?;
        let mut entries = Vec::new();
        while let Some(entry) = db_cursor.try_next().await? {
            entries.push(entry);
        }

        metrics::histogram!("ledger_store_duration_seconds", "op" => "fetch_all")
            .record(started.elapsed().as_secs_f64());

        Ok(entries)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, entry_id = %entry_id))]
    async fn get(
        &self,
        owner_id: &str,
        entry_id: &str,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let entry = self
            .entries()
            .find_one(doc! { "_id": entry_id, "owner_id": owner_id }, None)
            .await?;
        Ok(entry)
    }

    #[instrument(skip(self, draft), fields(owner_id = %owner_id, kind = %draft.kind))]
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

        self.entries().insert_one(&entry, None).await?;

        metrics::counter!("ledger_entries_created_total").increment(1);
        tracing::info!(entry_id = %entry.id, amount_minor = entry.amount_minor, "Entry created");

        Ok(entry)
    }

    #[instrument(skip(self, patch), fields(owner_id = %owner_id, entry_id = %entry_id))]
    async fn update(
        &self,
        owner_id: &str,
        entry_id: &str,
        patch: &EntryPatch,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut set = doc! {
            "updated_at": Bson::DateTime(mongodb::bson::DateTime::from_chrono(Utc::now())),
        };
        if let Some(occurred_on) = patch.occurred_on {
            set.insert("occurred_on", occurred_on.to_string());
        }
        if let Some(kind) = patch.kind {
            set.insert("kind", kind.as_str());
        }
        if let Some(amount_minor) = patch.amount_minor {
            set.insert("amount_minor", amount_minor);
        }
        if let Some(ref category_id) = patch.category_id {
            set.insert("category_id", category_id.as_str());
        }
        if let Some(ref payment_method_id) = patch.payment_method_id {
            set.insert("payment_method_id", payment_method_id.as_str());
        }
        if let Some(ref funding_source_id) = patch.funding_source_id {
            set.insert("funding_source_id", funding_source_id.as_str());
        }
        if let Some(ref note) = patch.note {
            set.insert("note", note.as_str());
        }

        let mut unset = Document::new();
        match patch.attachment {
            Some(AttachmentChange::Set(ref attachment)) => {
                let value = mongodb::bson::to_bson(attachment).map_err(|e| {
                    LedgerError::Internal(anyhow::anyhow!("failed to serialize attachment: {}", e))
                })?;
                set.insert("attachment", value);
            }
            Some(AttachmentChange::Remove) => {
                unset.insert("attachment", "");
            }
            None => {}
        }

        let mut update = doc! { "$set": set };
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .entries()
            .find_one_and_update(doc! { "_id": entry_id, "owner_id": owner_id }, update, options)
            .await?
            .ok_or_else(|| LedgerError::NotFound(anyhow::anyhow!("entry {} not found", entry_id)))?;

        tracing::info!(entry_id = %entry_id, "Entry updated");

        Ok(updated)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, entry_id = %entry_id))]
    async fn delete(&self, owner_id: &str, entry_id: &str) -> Result<(), LedgerError> {
        let result = self
            .entries()
            .delete_one(doc! { "_id": entry_id, "owner_id": owner_id }, None)
            .await?;

        if result.deleted_count == 0 {
            return Err(LedgerError::NotFound(anyhow::anyhow!(
                "entry {} not found",
                entry_id
            )));
        }

        metrics::counter!("ledger_entries_deleted_total").increment(1);
        tracing::info!(entry_id = %entry_id, "Entry deleted");

        Ok(())
    }
}
