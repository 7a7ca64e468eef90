pub mod attachment;
pub mod entry;
pub mod filter;
pub mod totals;

pub use attachment::{Attachment, STAGING_SEGMENT};
pub use entry::{AttachmentChange, EntryDraft, EntryKind, EntryPatch, LedgerEntry};
pub use filter::{EntryPage, FilterSpec, PageCursor};
pub use totals::AggregateTotals;
