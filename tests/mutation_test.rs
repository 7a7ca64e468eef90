mod common;

use common::{date, draft, spawn, test_config, FailingObjectStore, TEST_USER_ID};
use ledger_sync::error::ErrorKind;
use ledger_sync::identity::{AnonymousIdentity, StaticIdentity};
use ledger_sync::models::{Attachment, AttachmentChange, EntryKind, EntryPatch};
use ledger_sync::services::{
    EntryStore, MemoryEntryStore, MemoryObjectStore, ObjectStore, UploadOutcome,
};
use ledger_sync::startup::LedgerSystem;
use std::sync::atomic::Ordering;
use std::sync::Arc;

async fn stage_receipt(
    test: &common::TestSystem,
    placeholder: &str,
) -> Attachment {
    let task = test
        .system
        .attachments
        .stage(
            TEST_USER_ID,
            placeholder,
            vec![5u8; 2048],
            "receipt.jpg",
            "image/jpeg",
        )
        .unwrap();
    match task.finish().await.unwrap() {
        UploadOutcome::Completed(a) => a,
        UploadOutcome::Cancelled => panic!("upload was not cancelled"),
    }
}

#[tokio::test]
async fn create_with_staged_attachment_attaches_the_permanent_descriptor() {
    let test = spawn(10);
    let staged = stage_receipt(&test, "ph-create").await;

    let entry = test
        .system
        .mutator
        .create_entry(date_draft(), Some(staged.clone()))
        .await
        .unwrap();

    let attachment = entry.attachment.expect("attachment present");
    assert!(!attachment.is_staged());
    assert!(attachment.storage_key.contains(&format!("/{}/", entry.id)));
    assert_eq!(attachment.original_name, "receipt.jpg");

    // Temporary object cleaned up, permanent one resolvable.
    let err = test.objects.get(&staged.storage_key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(test.objects.contains(&attachment.storage_key).await);

    // The mutation refreshed the feed.
    let snap = test.system.view.snapshot().await;
    assert_eq!(snap.entries.len(), 1);
}

#[tokio::test]
async fn commit_failure_still_creates_the_entry_without_an_attachment() {
    let store = MemoryEntryStore::new();
    let objects = Arc::new(FailingObjectStore::new(MemoryObjectStore::new()));
    let system = LedgerSystem::assemble(
        Arc::new(store.clone()),
        objects.clone(),
        Arc::new(StaticIdentity::new(TEST_USER_ID)),
        &test_config(10),
    );

    let task = system
        .attachments
        .stage(TEST_USER_ID, "ph-fail", vec![8u8; 512], "r.png", "image/png")
        .unwrap();
    let staged = match task.finish().await.unwrap() {
        UploadOutcome::Completed(a) => a,
        UploadOutcome::Cancelled => panic!("upload was not cancelled"),
    };

    // The commit's read of the staged object will fail.
    objects.fail_gets.store(true, Ordering::SeqCst);

    let entry = system
        .mutator
        .create_entry(date_draft(), Some(staged))
        .await
        .unwrap();
    assert!(entry.attachment.is_none());

    // The entry itself made it into the collection.
    let stored = store.get(TEST_USER_ID, &entry.id).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn update_commits_a_staged_attachment_before_persisting() {
    let test = spawn(10);
    let entry = test
        .system
        .mutator
        .create_entry(date_draft(), None)
        .await
        .unwrap();

    let staged = stage_receipt(&test, "ph-update").await;
    let patch = EntryPatch {
        attachment: Some(AttachmentChange::Set(staged.clone())),
        ..Default::default()
    };
    let updated = test
        .system
        .mutator
        .update_entry(&entry.id, patch)
        .await
        .unwrap();

    let attachment = updated.attachment.expect("attachment present");
    assert!(!attachment.is_staged());
    let err = test.objects.get(&staged.storage_key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn remove_change_clears_the_attachment_field() {
    let test = spawn(10);
    let staged = stage_receipt(&test, "ph-remove").await;
    let entry = test
        .system
        .mutator
        .create_entry(date_draft(), Some(staged))
        .await
        .unwrap();
    assert!(entry.attachment.is_some());

    let patch = EntryPatch {
        attachment: Some(AttachmentChange::Remove),
        ..Default::default()
    };
    let updated = test
        .system
        .mutator
        .update_entry(&entry.id, patch)
        .await
        .unwrap();
    assert!(updated.attachment.is_none());
}

#[tokio::test]
async fn deleting_twice_resolves_as_success_both_times() {
    let test = spawn(10);
    let entry = test
        .system
        .mutator
        .create_entry(date_draft(), None)
        .await
        .unwrap();

    test.system.mutator.delete_entry(&entry.id).await.unwrap();
    test.system.mutator.delete_entry(&entry.id).await.unwrap();

    let snap = test.system.view.snapshot().await;
    assert!(snap.entries.is_empty());
}

#[tokio::test]
async fn delete_proceeds_when_the_binary_is_already_gone() {
    let test = spawn(10);
    let staged = stage_receipt(&test, "ph-gone").await;
    let entry = test
        .system
        .mutator
        .create_entry(date_draft(), Some(staged))
        .await
        .unwrap();
    let key = entry.attachment.as_ref().unwrap().storage_key.clone();

    // Binary disappears out-of-band.
    test.objects.delete(&key).await.unwrap();

    test.system.mutator.delete_entry(&entry.id).await.unwrap();
    let stored = test.store.get(TEST_USER_ID, &entry.id).await.unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn invalid_drafts_and_patches_are_rejected() {
    let test = spawn(10);

    let mut bad = date_draft();
    bad.amount_minor = -5;
    let err = test
        .system
        .mutator
        .create_entry(bad, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let entry = test
        .system
        .mutator
        .create_entry(date_draft(), None)
        .await
        .unwrap();
    let err = test
        .system
        .mutator
        .update_entry(&entry.id, EntryPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn mutations_require_a_caller_identity() {
    let system = LedgerSystem::assemble(
        Arc::new(MemoryEntryStore::new()),
        Arc::new(MemoryObjectStore::new()),
        Arc::new(AnonymousIdentity),
        &test_config(10),
    );

    let err = system
        .mutator
        .create_entry(date_draft(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let err = system.mutator.delete_entry("whatever").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn update_of_a_missing_entry_is_not_found() {
    let test = spawn(10);
    let patch = EntryPatch {
        note: Some("hello".to_string()),
        ..Default::default()
    };
    let err = test
        .system
        .mutator
        .update_entry("missing", patch)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn date_draft() -> ledger_sync::models::EntryDraft {
    draft(date(2024, 7, 1), EntryKind::Expense, 1200)
}
