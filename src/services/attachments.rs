//! Attachment staging and commit.
//!
//! A receipt is uploaded before its owning entry exists, so it is staged
//! under a placeholder-id key carrying the reserved staging segment. Once
//! the entry is committed and has a permanent identifier, the staged object
//! is relocated to its owner-keyed location and the temporary object is
//! cleaned up best-effort.

use crate::error::LedgerError;
use crate::models::{Attachment, STAGING_SEGMENT};
use crate::services::storage::{DeleteOutcome, ObjectMetadata, ObjectStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Transfer checkpoint granularity; progress and cancellation are observed
/// between chunks.
const UPLOAD_CHUNK_BYTES: usize = 256 * 1024;

/// Upload size limit (20MB).
pub const MAX_ATTACHMENT_BYTES: usize = 20 * 1024 * 1024;

/// Advisory transfer progress. Completion is signaled by
/// [`UploadTask::finish`], never by the last progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.bytes_sent as f64 / self.total_bytes as f64
        }
    }
}

/// Terminal state of a staging upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Completed(Attachment),
    Cancelled,
}

/// Handle to an in-flight staging upload: a consumable progress stream, a
/// cancellation token, and the completion future.
#[derive(Debug)]
pub struct UploadTask {
    progress: Option<ReceiverStream<UploadProgress>>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<UploadOutcome, LedgerError>>,
}

impl UploadTask {
    /// Take the progress stream. Events are dropped when the consumer lags;
    /// partial progress must never be treated as success.
    pub fn take_progress(&mut self) -> Option<ReceiverStream<UploadProgress>> {
        self.progress.take()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation; the transfer stops at the next checkpoint and
    /// nothing is persisted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn finish(self) -> Result<UploadOutcome, LedgerError> {
        self.handle
            .await
            .map_err(|e| LedgerError::Internal(anyhow::anyhow!("upload task failed: {}", e)))?
    }
}

/// Stages receipt uploads and commits them to their permanent location.
pub struct AttachmentService {
    objects: Arc<dyn ObjectStore>,
}

impl AttachmentService {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// Upload `data` to a temporary location namespaced by the owner's
    /// placeholder id, with a millisecond disambiguator so repeated uploads
    /// under the same placeholder never collide.
    #[instrument(skip(self, data), fields(owner_id = %owner_id, placeholder_id = %placeholder_id, size = data.len()))]
    pub fn stage(
        &self,
        owner_id: &str,
        placeholder_id: &str,
        data: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<UploadTask, LedgerError> {
        if data.is_empty() {
            return Err(LedgerError::Validation(anyhow::anyhow!("no file content")));
        }
        if data.len() > MAX_ATTACHMENT_BYTES {
            return Err(LedgerError::Validation(anyhow::anyhow!(
                "file too large (max {} bytes)",
                MAX_ATTACHMENT_BYTES
            )));
        }

        let file_name = sanitize_file_name(file_name);
        let key = staged_key(owner_id, placeholder_id, &file_name);
        let mime_type = mime_type.to_string();
        let metadata = ObjectMetadata {
            original_name: file_name.clone(),
        };

        let cancel = CancellationToken::new();
        let (progress_tx, progress_rx) = mpsc::channel(16);

        let objects = Arc::clone(&self.objects);
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let total = data.len() as u64;
            let mut staged = Vec::with_capacity(data.len());
            let mut bytes_sent = 0u64;

            for chunk in data.chunks(UPLOAD_CHUNK_BYTES) {
                if task_cancel.is_cancelled() {
                    tracing::info!(key = %key, bytes_sent, "Upload cancelled");
                    return Ok(UploadOutcome::Cancelled);
                }
                staged.extend_from_slice(chunk);
                bytes_sent += chunk.len() as u64;
                let _ = progress_tx.try_send(UploadProgress {
                    bytes_sent,
                    total_bytes: total,
                });
                tokio::task::yield_now().await;
            }

            if task_cancel.is_cancelled() {
                tracing::info!(key = %key, "Upload cancelled before write");
                return Ok(UploadOutcome::Cancelled);
            }

            objects.put(&key, staged, &mime_type, &metadata).await?;

            metrics::counter!("attachment_uploads_total").increment(1);
            metrics::histogram!("attachment_upload_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            tracing::info!(key = %key, size = total, "Attachment staged");

            Ok(UploadOutcome::Completed(Attachment {
                storage_key: key,
                original_name: metadata.original_name,
                mime_type,
                size: total as i64,
                uploaded_at: Utc::now(),
            }))
        });

        Ok(UploadTask {
            progress: Some(ReceiverStream::new(progress_rx)),
            cancel,
            handle,
        })
    }

    /// Relocate a staged attachment to its permanent, owner-keyed location.
    ///
    /// Reads the staged object's current bytes and stored metadata, writes
    /// them under the now-known entry id, and returns the new descriptor.
    /// Temporary-object cleanup is best-effort: "already absent" counts as
    /// success, any other cleanup failure is logged and does not fail the
    /// commit. A non-staged attachment passes through unchanged.
    #[instrument(skip(self, staged), fields(owner_id = %owner_id, entry_id = %entry_id, staged_key = %staged.storage_key))]
    pub async fn commit(
        &self,
        owner_id: &str,
        entry_id: &str,
        staged: &Attachment,
    ) -> Result<Attachment, LedgerError> {
        if !staged.is_staged() {
            return Ok(staged.clone());
        }

        let blob = self.objects.get(&staged.storage_key).await?;
        let key = permanent_key(owner_id, entry_id, &blob.metadata.original_name);

        self.objects
            .put(&key, blob.data.clone(), &blob.content_type, &blob.metadata)
            .await?;

        let attachment = Attachment {
            storage_key: key.clone(),
            original_name: blob.metadata.original_name,
            mime_type: blob.content_type,
            size: blob.data.len() as i64,
            uploaded_at: Utc::now(),
        };

        match self.objects.delete(&staged.storage_key).await {
            Ok(DeleteOutcome::Deleted) => {}
            Ok(DeleteOutcome::AlreadyAbsent) => {
                tracing::debug!(staged_key = %staged.storage_key, "Staged object already gone");
            }
            Err(e) => {
                tracing::warn!(
                    staged_key = %staged.storage_key,
                    error = %e,
                    "Staged object cleanup failed; attachment is committed regardless"
                );
            }
        }

        metrics::counter!("attachment_commits_total").increment(1);
        tracing::info!(key = %key, "Attachment committed");

        Ok(attachment)
    }

    /// Delete a binary object by reference. Missing objects resolve as
    /// [`DeleteOutcome::AlreadyAbsent`].
    pub async fn remove(&self, key: &str) -> Result<DeleteOutcome, LedgerError> {
        self.objects.delete(key).await
    }
}

fn staged_key(owner_id: &str, placeholder_id: &str, file_name: &str) -> String {
    format!(
        "attachments/{}/{}/{}/{}-{}",
        owner_id,
        STAGING_SEGMENT,
        placeholder_id,
        Utc::now().timestamp_millis(),
        file_name
    )
}

fn permanent_key(owner_id: &str, entry_id: &str, file_name: &str) -> String {
    format!("attachments/{}/{}/{}", owner_id, entry_id, file_name)
}

fn sanitize_file_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
