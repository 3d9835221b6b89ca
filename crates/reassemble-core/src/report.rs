//! Operation reports and progress reporting.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// Why an entry was refused during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// The entry path contains a parent-directory component.
    ParentTraversal,

    /// The entry path resolves outside the extraction root, e.g. through a
    /// previously extracted symlinked directory.
    EscapesRoot,

    /// The symlink target is absolute.
    AbsoluteSymlink,

    /// The symlink target resolves outside the extraction root.
    SymlinkEscape,

    /// The hardlink target is not a safe path inside the archive.
    HardlinkEscape,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::ParentTraversal => "parent directory traversal",
            Self::EscapesRoot => "resolves outside the extraction root",
            Self::AbsoluteSymlink => "absolute symlink target",
            Self::SymlinkEscape => "symlink target outside the extraction root",
            Self::HardlinkEscape => "hardlink target outside the extraction root",
        };
        f.write_str(reason)
    }
}

/// An entry skipped because writing it would escape the extraction root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedEntry {
    /// Raw entry path as recorded in the archive.
    pub path: PathBuf,

    /// Why the entry was refused.
    pub reason: BlockReason,
}

/// Report of a snapshot extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Number of regular files written.
    pub files_extracted: usize,

    /// Number of directory entries created.
    pub directories_created: usize,

    /// Number of symlinks created.
    pub symlinks_created: usize,

    /// Number of hardlinks created.
    pub hardlinks_created: usize,

    /// Total file bytes written to disk.
    pub bytes_written: u64,

    /// Entries refused as traversal attempts.
    pub blocked: Vec<BlockedEntry>,

    /// Special entries (devices, FIFOs) that were not materialized.
    pub unsupported: usize,

    /// Duration of the extraction.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns total number of filesystem nodes created.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted + self.directories_created + self.symlinks_created + self.hardlinks_created
    }

    /// Returns whether any entry was blocked.
    #[must_use]
    pub fn has_blocked(&self) -> bool {
        !self.blocked.is_empty()
    }
}

/// Report of an archive rebuild.
#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    /// Entries read from the source archive.
    pub entries_read: usize,

    /// Entries copied into the new archive, excluding the descriptor.
    pub entries_kept: usize,

    /// Entries dropped by the filter.
    pub entries_excluded: usize,

    /// Uncompressed content bytes copied.
    pub bytes_copied: u64,

    /// Size of the compressed output.
    pub bytes_compressed: u64,

    /// Duration of the rebuild.
    pub duration: Duration,
}

impl RebuildReport {
    /// Returns the number of entries in the new archive, descriptor included.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.entries_kept + 1
    }
}

/// Callback trait for progress reporting during extraction.
///
/// Snapshot streams do not announce their entry count, so only a running
/// count is reported.
///
/// # Examples
///
/// ```
/// use reassemble_core::ProgressCallback;
/// use std::path::Path;
///
/// struct PrintProgress;
///
/// impl ProgressCallback for PrintProgress {
///     fn on_entry(&mut self, path: &Path, current: usize) {
///         println!("[{current}] {}", path.display());
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_complete(&mut self) {
///         println!("done");
///     }
/// }
/// ```
pub trait ProgressCallback {
    /// Called before an entry is processed.
    ///
    /// * `path` - Normalized entry path
    /// * `current` - Entry number (1-indexed)
    fn on_entry(&mut self, path: &Path, current: usize);

    /// Called after file content has been written.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called once when the operation is complete.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry(&mut self, _path: &Path, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_complete(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report() {
        let report = ExtractionReport::new();
        assert_eq!(report.files_extracted, 0);
        assert_eq!(report.bytes_written, 0);
        assert!(!report.has_blocked());
    }

    #[test]
    fn test_total_items() {
        let mut report = ExtractionReport::new();
        report.files_extracted = 10;
        report.directories_created = 5;
        report.symlinks_created = 2;
        report.hardlinks_created = 1;
        assert_eq!(report.total_items(), 18);
    }

    #[test]
    fn test_block_reason_display() {
        assert_eq!(
            BlockReason::AbsoluteSymlink.to_string(),
            "absolute symlink target"
        );
        assert!(BlockReason::ParentTraversal.to_string().contains("traversal"));
    }

    #[test]
    fn test_rebuild_total_entries_counts_descriptor() {
        let report = RebuildReport {
            entries_kept: 3,
            ..Default::default()
        };
        assert_eq!(report.total_entries(), 4);
    }
}
