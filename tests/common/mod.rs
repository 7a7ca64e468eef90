use async_trait::async_trait;
use chrono::NaiveDate;
use ledger_sync::config::{
    LedgerConfig, MongoConfig, PagingConfig, StorageBackend, StorageConfig,
};
use ledger_sync::error::LedgerError;
use ledger_sync::identity::StaticIdentity;
use ledger_sync::models::{EntryDraft, EntryKind};
use ledger_sync::services::{
    DeleteOutcome, EntryStore, MemoryEntryStore, MemoryObjectStore, ObjectBlob, ObjectMetadata,
    ObjectStore,
};
use ledger_sync::startup::LedgerSystem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const TEST_USER_ID: &str = "user-test-1";

pub struct TestSystem {
    pub system: LedgerSystem,
    pub store: MemoryEntryStore,
    pub objects: Arc<MemoryObjectStore>,
}

pub fn test_config(page_size: usize) -> LedgerConfig {
    LedgerConfig {
        environment: "test".to_string(),
        log_level: "info".to_string(),
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "unused".to_string(),
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            local_path: "unused".to_string(),
        },
        paging: PagingConfig {
            page_size,
            aggregate_cap: 1000,
        },
    }
}

/// Assemble the full subsystem over in-process backends for a signed-in
/// test user.
pub fn spawn(page_size: usize) -> TestSystem {
    let store = MemoryEntryStore::new();
    let objects = Arc::new(MemoryObjectStore::new());
    let identity = Arc::new(StaticIdentity::new(TEST_USER_ID));

    let system = LedgerSystem::assemble(
        Arc::new(store.clone()),
        objects.clone(),
        identity,
        &test_config(page_size),
    );

    TestSystem {
        system,
        store,
        objects,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn draft(occurred_on: NaiveDate, kind: EntryKind, amount_minor: i64) -> EntryDraft {
    EntryDraft {
        occurred_on,
        kind,
        amount_minor,
        category_id: "general".to_string(),
        payment_method_id: "card".to_string(),
        funding_source_id: None,
        note: None,
    }
}

/// Seed `count` expense entries on consecutive dates, newest last.
pub async fn seed_entries(store: &MemoryEntryStore, count: usize) {
    let start = date(2024, 1, 1);
    for i in 0..count {
        let day = start + chrono::Duration::days(i as i64);
        store
            .insert(TEST_USER_ID, &draft(day, EntryKind::Expense, 100))
            .await
            .expect("seed insert");
    }
}

/// Object store wrapper that fails reads and/or writes on demand, for
/// exercising the partial-failure paths of attachment commit.
pub struct FailingObjectStore {
    inner: MemoryObjectStore,
    pub fail_gets: AtomicBool,
    pub fail_puts: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl FailingObjectStore {
    pub fn new(inner: MemoryObjectStore) -> Self {
        Self {
            inner,
            fail_gets: AtomicBool::new(false),
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ObjectStore for FailingObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<(), LedgerError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(LedgerError::Transient(anyhow::anyhow!(
                "injected put failure"
            )));
        }
        self.inner.put(key, data, content_type, metadata).await
    }

    async fn get(&self, key: &str) -> Result<ObjectBlob, LedgerError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(LedgerError::Transient(anyhow::anyhow!(
                "injected get failure"
            )));
        }
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, LedgerError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(LedgerError::Transient(anyhow::anyhow!(
                "injected delete failure"
            )));
        }
        self.inner.delete(key).await
    }
}
