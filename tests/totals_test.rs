mod common;

use common::{date, draft, spawn, TEST_USER_ID};
use ledger_sync::models::{EntryKind, FilterSpec};
use ledger_sync::services::EntryStore;

#[tokio::test]
async fn balance_equals_income_minus_expense() {
    let test = spawn(10);
    test.store
        .insert(TEST_USER_ID, &draft(date(2024, 2, 1), EntryKind::Income, 5000))
        .await
        .unwrap();
    test.store
        .insert(TEST_USER_ID, &draft(date(2024, 2, 2), EntryKind::Expense, 1200))
        .await
        .unwrap();
    test.store
        .insert(TEST_USER_ID, &draft(date(2024, 2, 3), EntryKind::Expense, 800))
        .await
        .unwrap();

    test.system.view.load(FilterSpec::default()).await.unwrap();
    let totals = test.system.view.snapshot().await.totals;

    assert_eq!(totals.income_minor, 5000);
    assert_eq!(totals.expense_minor, 2000);
    assert_eq!(totals.balance_minor, totals.income_minor - totals.expense_minor);
}

#[tokio::test]
async fn totals_ignore_the_active_list_filter() {
    let test = spawn(10);
    test.store
        .insert(TEST_USER_ID, &draft(date(2024, 2, 1), EntryKind::Income, 5000))
        .await
        .unwrap();
    test.store
        .insert(TEST_USER_ID, &draft(date(2024, 2, 2), EntryKind::Expense, 1200))
        .await
        .unwrap();

    // Filter the visible list down to income only.
    let income_only = FilterSpec {
        kind: Some(EntryKind::Income),
        ..Default::default()
    };
    test.system.view.load(income_only).await.unwrap();

    let snap = test.system.view.snapshot().await;
    assert_eq!(snap.entries.len(), 1);
    // The aggregate still covers the hidden expense.
    assert_eq!(snap.totals.expense_minor, 1200);
    assert_eq!(snap.totals.balance_minor, 3800);
}

#[tokio::test]
async fn creating_a_hidden_expense_still_moves_the_totals() {
    let test = spawn(10);
    test.store
        .insert(TEST_USER_ID, &draft(date(2024, 2, 1), EntryKind::Income, 5000))
        .await
        .unwrap();

    let income_only = FilterSpec {
        kind: Some(EntryKind::Income),
        ..Default::default()
    };
    test.system.view.load(income_only).await.unwrap();
    let before = test.system.view.snapshot().await.totals;

    // The new expense is hidden by the active filter but must hit totals.
    test.system
        .mutator
        .create_entry(draft(date(2024, 2, 5), EntryKind::Expense, 1500), None)
        .await
        .unwrap();

    let snap = test.system.view.snapshot().await;
    assert!(snap.entries.iter().all(|e| e.kind == EntryKind::Income));
    assert_eq!(snap.totals.expense_minor, before.expense_minor + 1500);
    assert_eq!(snap.totals.balance_minor, before.balance_minor - 1500);
}

#[tokio::test]
async fn empty_collection_yields_zero_totals() {
    let test = spawn(10);
    test.system.view.load(FilterSpec::default()).await.unwrap();
    let totals = test.system.view.snapshot().await.totals;
    assert_eq!(totals, Default::default());
}
