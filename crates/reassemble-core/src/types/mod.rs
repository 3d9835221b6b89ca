//! Core types for snapshot entries and extraction roots.

mod entry;
mod target;

pub use entry::ArchiveEntry;
pub use entry::EntryKind;
pub use entry::normalize_entry_path;
pub use target::ExtractionTarget;
