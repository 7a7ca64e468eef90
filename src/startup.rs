//! Subsystem wiring.
//!
//! Builds the backends from configuration and assembles the service
//! objects the presentation layer holds by reference: the view controller,
//! the mutation orchestrator, and the attachment stager.

use crate::config::{LedgerConfig, StorageBackend};
use crate::error::LedgerError;
use crate::identity::IdentityProvider;
use crate::services::aggregator::TotalsAggregator;
use crate::services::attachments::AttachmentService;
use crate::services::database::{EntryStore, MongoEntryStore};
use crate::services::storage::{LocalObjectStore, MemoryObjectStore, ObjectStore};
use crate::services::view::LedgerView;
use crate::services::LedgerMutator;
use std::sync::Arc;

pub struct LedgerSystem {
    pub view: Arc<LedgerView>,
    pub mutator: Arc<LedgerMutator>,
    pub attachments: Arc<AttachmentService>,
}

impl LedgerSystem {
    pub async fn build(
        config: LedgerConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, LedgerError> {
        let mongo = MongoEntryStore::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        mongo.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize collection indexes: {}", e);
            e
        })?;
        let store: Arc<dyn EntryStore> = Arc::new(mongo);

        let objects: Arc<dyn ObjectStore> = match config.storage.backend {
            StorageBackend::Local => Arc::new(
                LocalObjectStore::new(&config.storage.local_path)
                    .await
                    .map_err(|e| {
                        tracing::error!(
                            "Failed to initialize local storage at {}: {}",
                            config.storage.local_path,
                            e
                        );
                        e
                    })?,
            ),
            StorageBackend::Memory => Arc::new(MemoryObjectStore::new()),
        };

        Ok(Self::assemble(store, objects, identity, &config))
    }

    /// Wire the service objects over already-constructed backends. Split
    /// out so tests can assemble the system over in-process stores.
    pub fn assemble(
        store: Arc<dyn EntryStore>,
        objects: Arc<dyn ObjectStore>,
        identity: Arc<dyn IdentityProvider>,
        config: &LedgerConfig,
    ) -> Self {
        let attachments = Arc::new(AttachmentService::new(objects));
        let aggregator =
            TotalsAggregator::with_cap(Arc::clone(&store), config.paging.aggregate_cap);
        let view = Arc::new(LedgerView::new(
            Arc::clone(&store),
            aggregator,
            Arc::clone(&identity),
            config.paging.page_size,
        ));
        let mutator = Arc::new(LedgerMutator::new(
            store,
            Arc::clone(&attachments),
            identity,
            Arc::clone(&view),
        ));

        Self {
            view,
            mutator,
            attachments,
        }
    }
}
