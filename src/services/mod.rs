pub mod aggregator;
pub mod attachments;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod mutations;
pub mod storage;
pub mod view;

pub use aggregator::TotalsAggregator;
pub use attachments::{AttachmentService, UploadOutcome, UploadProgress, UploadTask};
pub use database::{EntryStore, MongoEntryStore};
pub use memory::MemoryEntryStore;
pub use metrics::{init_metrics, render_metrics};
pub use mutations::LedgerMutator;
pub use storage::{
    DeleteOutcome, LocalObjectStore, MemoryObjectStore, ObjectBlob, ObjectMetadata, ObjectStore,
};
pub use view::{LedgerView, ViewError, ViewSnapshot};
