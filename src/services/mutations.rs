//! Mutation orchestration.
//!
//! Combines entry create/update/delete with the attachment lifecycle and
//! triggers a view refresh after each mutation. Multi-step sequences here
//! are best-effort: there is no server-side transaction, and a failure
//! between steps leaves an accepted partial state rather than rolling back.

use crate::error::{ErrorKind, LedgerError};
use crate::identity::{require_caller, IdentityProvider};
use crate::models::{Attachment, AttachmentChange, EntryDraft, EntryPatch, LedgerEntry};
use crate::services::attachments::AttachmentService;
use crate::services::database::EntryStore;
use crate::services::storage::DeleteOutcome;
use crate::services::view::LedgerView;
use std::sync::Arc;
use tracing::instrument;

pub struct LedgerMutator {
    store: Arc<dyn EntryStore>,
    attachments: Arc<AttachmentService>,
    identity: Arc<dyn IdentityProvider>,
    view: Arc<LedgerView>,
}

impl LedgerMutator {
    pub fn new(
        store: Arc<dyn EntryStore>,
        attachments: Arc<AttachmentService>,
        identity: Arc<dyn IdentityProvider>,
        view: Arc<LedgerView>,
    ) -> Self {
        Self {
            store,
            attachments,
            identity,
            view,
        }
    }

    /// Create an entry. When a staged attachment is supplied, it is
    /// committed under the newly assigned id and attached via a follow-up
    /// partial update. A commit or follow-up failure leaves the entry
    /// committed without its attachment; the create itself still succeeds.
    #[instrument(skip(self, draft, staged))]
    pub async fn create_entry(
        &self,
        draft: EntryDraft,
        staged: Option<Attachment>,
    ) -> Result<LedgerEntry, LedgerError> {
        let owner_id = require_caller(self.identity.as_ref())?;
        draft.validate()?;

        let mut entry = self.store.insert(&owner_id, &draft).await?;

        if let Some(staged) = staged {
            match self.attachments.commit(&owner_id, &entry.id, &staged).await {
                Ok(permanent) => {
                    let patch = EntryPatch {
                        attachment: Some(AttachmentChange::Set(permanent)),
                        ..Default::default()
                    };
                    match self.store.update(&owner_id, &entry.id, &patch).await {
                        Ok(updated) => entry = updated,
                        Err(e) => {
                            tracing::error!(
                                entry_id = %entry.id,
                                staged_key = %staged.storage_key,
                                error = %e,
                                "Failed to attach committed receipt; entry left without attachment"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        entry_id = %entry.id,
                        staged_key = %staged.storage_key,
                        error = %e,
                        "Attachment commit failed; entry left without attachment"
                    );
                }
            }
        }

        self.refresh_view().await;
        Ok(entry)
    }

    /// Apply a partial merge. A staged attachment in the patch is committed
    /// first and replaced with its permanent descriptor; an explicit
    /// `Remove` clears the field server-side.
    #[instrument(skip(self, patch), fields(entry_id = %entry_id))]
    pub async fn update_entry(
        &self,
        entry_id: &str,
        mut patch: EntryPatch,
    ) -> Result<LedgerEntry, LedgerError> {
        let owner_id = require_caller(self.identity.as_ref())?;
        patch.validate()?;

        if let Some(AttachmentChange::Set(ref attachment)) = patch.attachment {
            if attachment.is_staged() {
                let permanent = self
                    .attachments
                    .commit(&owner_id, entry_id, attachment)
                    .await?;
                patch.attachment = Some(AttachmentChange::Set(permanent));
            }
        }

        let updated = self.store.update(&owner_id, entry_id, &patch).await?;

        self.refresh_view().await;
        Ok(updated)
    }

    /// Delete an entry and its binary attachment. The attachment delete
    /// runs first and is best-effort: "already absent" is success, any
    /// other failure is logged and the entry delete proceeds anyway, since
    /// orphaning a binary object is preferred over blocking the delete.
    /// Deleting an entry that no longer exists resolves as success.
    #[instrument(skip(self), fields(entry_id = %entry_id))]
    pub async fn delete_entry(&self, entry_id: &str) -> Result<(), LedgerError> {
        let owner_id = require_caller(self.identity.as_ref())?;

        let entry = match self.store.get(&owner_id, entry_id).await? {
            Some(entry) => entry,
            None => {
                tracing::debug!(entry_id = %entry_id, "Entry already deleted");
                return Ok(());
            }
        };

        if let Some(ref attachment) = entry.attachment {
            match self.attachments.remove(&attachment.storage_key).await {
                Ok(DeleteOutcome::Deleted) => {}
                Ok(DeleteOutcome::AlreadyAbsent) => {
                    tracing::debug!(key = %attachment.storage_key, "Receipt already gone");
                }
                Err(e) => {
                    tracing::warn!(
                        key = %attachment.storage_key,
                        error = %e,
                        "Receipt delete failed; deleting entry anyway"
                    );
                }
            }
        }

        match self.store.delete(&owner_id, entry_id).await {
            Ok(()) => {}
            // Raced with another delete of the same entry.
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        self.refresh_view().await;
        Ok(())
    }

    async fn refresh_view(&self) {
        if let Err(e) = self.view.refresh().await {
            tracing::warn!(error = %e, "Post-mutation refresh failed");
        }
    }
}
