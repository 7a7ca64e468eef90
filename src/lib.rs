//! Ledger Sync - ledger synchronization and attachment staging for a
//! personal finance tracker.
//!
//! The crate serves a filtered, cursor-paginated feed of ledger entries,
//! keeps an always-unfiltered totals aggregate alongside it, and binds
//! binary receipt attachments to entries whose permanent identifier does
//! not exist until the entry is committed.

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod observability;
pub mod services;
pub mod startup;
