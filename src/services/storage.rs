//! Binary object store.
//!
//! Path-addressed writes with content-type and free-form metadata, reads by
//! reference, and deletes that report "already absent" distinguishably from
//! a real failure so cleanup paths can stay idempotent.

use crate::error::LedgerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

/// Free-form metadata stored alongside an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub original_name: String,
}

/// An object's bytes plus its stored content type and metadata.
#[derive(Debug, Clone)]
pub struct ObjectBlob {
    pub data: Vec<u8>,
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

/// Outcome of a delete; a missing object is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<(), LedgerError>;

    async fn get(&self, key: &str) -> Result<ObjectBlob, LedgerError>;

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, LedgerError>;
}

/// Sidecar record for [`LocalObjectStore`] carrying what a remote store
/// would keep as object headers.
#[derive(Debug, Serialize, Deserialize)]
struct SidecarRecord {
    content_type: String,
    metadata: ObjectMetadata,
}

/// Filesystem-backed object store. Each object is a file under `base_path`
/// with a `.meta.json` sidecar for content type and metadata.
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.meta.json", key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<(), LedgerError> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;

        let record = SidecarRecord {
            content_type: content_type.to_string(),
            metadata: metadata.clone(),
        };
        let sidecar = serde_json::to_vec(&record).map_err(|e| {
            LedgerError::Internal(anyhow::anyhow!("failed to encode object metadata: {}", e))
        })?;
        fs::write(self.sidecar_path(key), sidecar).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ObjectBlob, LedgerError> {
        let data = fs::read(self.object_path(key)).await?;
        let sidecar = fs::read(self.sidecar_path(key)).await?;
        let record: SidecarRecord = serde_json::from_slice(&sidecar).map_err(|e| {
            LedgerError::Internal(anyhow::anyhow!("corrupt object metadata for {}: {}", key, e))
        })?;
        Ok(ObjectBlob {
            data,
            content_type: record.content_type,
            metadata: record.metadata,
        })
    }

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, LedgerError> {
        match fs::remove_file(self.object_path(key)).await {
            Ok(()) => {
                // Sidecar removal failing never masks the object delete.
                let _ = fs::remove_file(self.sidecar_path(key)).await;
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
    metadata: ObjectMetadata,
}

/// In-process object store for tests and the ephemeral backend.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an object currently resolves, without reading it.
    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<(), LedgerError> {
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ObjectBlob, LedgerError> {
        let guard = self.objects.lock().await;
        let stored = guard
            .get(key)
            .ok_or_else(|| LedgerError::NotFound(anyhow::anyhow!("object {} not found", key)))?;
        Ok(ObjectBlob {
            data: stored.data.clone(),
            content_type: stored.content_type.clone(),
            metadata: stored.metadata.clone(),
        })
    }

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, LedgerError> {
        match self.objects.lock().await.remove(key) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::AlreadyAbsent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn local_store_round_trips_bytes_and_metadata() {
        let base = format!("target/test-storage-{}", Uuid::new_v4());
        let store = LocalObjectStore::new(&base).await.unwrap();

        let metadata = ObjectMetadata {
            original_name: "receipt.jpg".to_string(),
        };
        store
            .put("a/b/receipt.jpg", vec![1, 2, 3], "image/jpeg", &metadata)
            .await
            .unwrap();

        let blob = store.get("a/b/receipt.jpg").await.unwrap();
        assert_eq!(blob.data, vec![1, 2, 3]);
        assert_eq!(blob.content_type, "image/jpeg");
        assert_eq!(blob.metadata, metadata);

        let _ = tokio::fs::remove_dir_all(&base).await;
    }

    #[tokio::test]
    async fn local_delete_of_missing_object_reports_already_absent() {
        let base = format!("target/test-storage-{}", Uuid::new_v4());
        let store = LocalObjectStore::new(&base).await.unwrap();

        assert_eq!(
            store.delete("never/existed").await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );

        let _ = tokio::fs::remove_dir_all(&base).await;
    }

    #[tokio::test]
    async fn local_get_of_missing_object_is_not_found() {
        let base = format!("target/test-storage-{}", Uuid::new_v4());
        let store = LocalObjectStore::new(&base).await.unwrap();

        let err = store.get("never/existed").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);

        let _ = tokio::fs::remove_dir_all(&base).await;
    }
}
