//! Filtered re-serialization of a snapshot.
//!
//! The rebuilder makes a second pass over the original snapshot, copies
//! every entry accepted by a predicate into a new gzip-compressed tar in
//! source order, and appends a build descriptor as the final entry. The
//! gzip header carries no timestamp, so identical inputs produce identical
//! output bytes.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use flate2::Compression;
use flate2::GzBuilder;
use tar::EntryType;
use tar::Header;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::BuildDescriptor;
use crate::ReassembleError;
use crate::RebuildConfig;
use crate::Result;
use crate::archive::SnapshotArchive;
use crate::audit::LargeFileRecord;
use crate::io::CountingWriter;
use crate::io::LengthCheckedReader;
use crate::report::RebuildReport;
use crate::types::ArchiveEntry;
use crate::types::EntryKind;
use crate::types::ExtractionTarget;
use crate::types::normalize_entry_path;

/// Exclusion rules for one rebuild.
///
/// An entry is kept only if it matches no blocked prefix and its path is
/// not in the removed set.
///
/// # Examples
///
/// ```
/// use reassemble_core::ExclusionRules;
///
/// let mut rules = ExclusionRules::new(vec!["var/log/".to_string()]);
/// rules.remove_path("opt/model.bin");
/// assert!(rules.is_blocked("var/log/syslog"));
/// assert!(!rules.is_blocked("var/log"));
/// assert!(rules.is_removed("opt/model.bin"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    blocked_prefixes: Vec<String>,
    removed_paths: HashSet<String>,
}

impl ExclusionRules {
    /// Creates rules with the given prefix block list and no removed paths.
    #[must_use]
    pub fn new(blocked_prefixes: Vec<String>) -> Self {
        Self {
            blocked_prefixes,
            removed_paths: HashSet::new(),
        }
    }

    /// Builds rules from the configured block list and the records the
    /// operator removed from an extraction under `target`.
    ///
    /// Records outside `target` are ignored with a warning.
    #[must_use]
    pub fn from_records(
        config: &RebuildConfig,
        target: &ExtractionTarget,
        removed: &[LargeFileRecord],
    ) -> Self {
        let mut rules = Self::new(config.blocked_prefixes.clone());
        for record in removed {
            match archive_path_of(target, &record.path) {
                Some(relative) => rules.remove_path(relative),
                None => warn!(
                    path = %record.path.display(),
                    "removed file is outside the extraction root, not excluding"
                ),
            }
        }
        rules
    }

    /// Adds a normalized archive path to the removed set.
    pub fn remove_path(&mut self, path: impl Into<String>) {
        self.removed_paths.insert(path.into());
    }

    /// Returns `true` if `path` starts with any blocked prefix.
    #[must_use]
    pub fn is_blocked(&self, path: &str) -> bool {
        self.blocked_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Returns `true` if `path` was selected for removal.
    #[must_use]
    pub fn is_removed(&self, path: &str) -> bool {
        self.removed_paths.contains(path)
    }

    /// Returns the number of paths selected for removal.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed_paths.len()
    }

    /// The rebuild predicate.
    #[must_use]
    pub fn keep(&self, entry: &ArchiveEntry) -> bool {
        if self.is_blocked(&entry.path) {
            debug!(path = %entry.path, "skipping blocked path");
            return false;
        }
        if self.is_removed(&entry.path) {
            info!(path = %entry.path, size = entry.size, "skipping removed large file");
            return false;
        }
        true
    }
}

/// Maps an on-disk path below `target` back to its archive path.
///
/// The file itself may already be deleted, so only its parent is
/// resolved when the path is not already in canonical form.
fn archive_path_of(target: &ExtractionTarget, path: &Path) -> Option<String> {
    target.relative(path).or_else(|| {
        let parent = path.parent()?.canonicalize().ok()?;
        target.relative(&parent.join(path.file_name()?))
    })
}

/// Writes a filtered copy of `archive` to `writer` as a gzip-compressed tar.
///
/// Entries for which `keep` returns `true` are copied in source order; the
/// descriptor is appended last. A source entry named like the descriptor is
/// dropped so the descriptor stays unique. Entries without a normalized
/// path (parent traversal) and the archive root entry are dropped, as are
/// hardlinks whose target was not written before them.
///
/// # Errors
///
/// - `ReassembleError::ArchiveFormat` if the snapshot cannot be reopened or
///   parsed
/// - `ReassembleError::ArchiveIntegrity` if an entry yields a different
///   number of bytes than its header claims
/// - `ReassembleError::Io` if writing the output fails
///
/// # Examples
///
/// ```no_run
/// use reassemble_core::ExclusionRules;
/// use reassemble_core::RebuildConfig;
/// use reassemble_core::SnapshotArchive;
/// use reassemble_core::rebuild_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RebuildConfig::default();
/// let rules = ExclusionRules::new(config.blocked_prefixes.clone());
/// let archive = SnapshotArchive::open("/tmp/snapshot.tar")?;
/// let output = std::fs::File::create("/tmp/context.tar.gz")?;
/// let report = rebuild_archive(&archive, &config.descriptor, |e| rules.keep(e), output)?;
/// println!("{} entries", report.total_entries());
/// # Ok(())
/// # }
/// ```
pub fn rebuild_archive<F, W>(
    archive: &SnapshotArchive,
    descriptor: &BuildDescriptor,
    mut keep: F,
    writer: W,
) -> Result<RebuildReport>
where
    F: FnMut(&ArchiveEntry) -> bool,
    W: Write,
{
    let start = Instant::now();
    let mut report = RebuildReport::default();

    let encoder = GzBuilder::new()
        .mtime(0)
        .write(CountingWriter::new(writer), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut written: HashSet<String> = HashSet::new();

    archive.for_each_entry(|item| {
        report.entries_read += 1;

        let Some(entry) = item.entry else {
            warn!(path = %item.raw_path.display(), "dropping entry with parent traversal");
            report.entries_excluded += 1;
            return Ok(());
        };

        if entry.path.is_empty() {
            report.entries_excluded += 1;
            return Ok(());
        }

        if entry.path == descriptor.name {
            warn!(path = %entry.path, "dropping source entry shadowed by the build descriptor");
            report.entries_excluded += 1;
            return Ok(());
        }

        if !keep(&entry) {
            report.entries_excluded += 1;
            return Ok(());
        }

        let mut header = copy_header(&entry, &item.header)?;

        match &entry.kind {
            EntryKind::File => {
                let mut checked = LengthCheckedReader::new(item.content, entry.size);
                if let Err(e) = builder.append_data(&mut header, &entry.path, &mut checked) {
                    if checked.is_mismatch() {
                        return Err(ReassembleError::ArchiveIntegrity {
                            path: entry.path,
                            expected: entry.size,
                            actual: checked.bytes_read(),
                        });
                    }
                    return Err(e.into());
                }
                report.bytes_copied += entry.size;
            }
            EntryKind::Symlink { target } => {
                builder.append_link(&mut header, &entry.path, target)?;
            }
            EntryKind::Hardlink { target } => {
                let Some(target) = normalize_entry_path(target).filter(|t| !t.is_empty()) else {
                    warn!(path = %entry.path, "dropping hardlink with unsafe target");
                    report.entries_excluded += 1;
                    return Ok(());
                };
                // A link to an excluded entry would make the context unpackable.
                if !written.contains(&target) {
                    warn!(path = %entry.path, %target, "dropping hardlink to excluded entry");
                    report.entries_excluded += 1;
                    return Ok(());
                }
                builder.append_link(&mut header, &entry.path, &target)?;
            }
            EntryKind::Directory | EntryKind::Other => {
                builder.append_data(&mut header, &entry.path, std::io::empty())?;
            }
        }

        written.insert(entry.path);
        report.entries_kept += 1;
        Ok(())
    })?;

    append_descriptor(&mut builder, descriptor)?;

    let encoder = builder.into_inner()?;
    let counting = encoder.finish()?;
    report.bytes_compressed = counting.total_bytes();
    report.duration = start.elapsed();

    info!(
        kept = report.entries_kept,
        excluded = report.entries_excluded,
        compressed_bytes = report.bytes_compressed,
        "rebuilt filtered archive"
    );

    Ok(report)
}

/// Rebuilds into memory and returns the compressed bytes with the report.
///
/// # Errors
///
/// Same as [`rebuild_archive`].
pub fn rebuild_to_vec<F>(
    archive: &SnapshotArchive,
    descriptor: &BuildDescriptor,
    keep: F,
) -> Result<(Vec<u8>, RebuildReport)>
where
    F: FnMut(&ArchiveEntry) -> bool,
{
    let mut buffer = Vec::new();
    let report = rebuild_archive(archive, descriptor, keep, &mut buffer)?;
    Ok((buffer, report))
}

/// Builds a fresh GNU header carrying the source entry's metadata.
fn copy_header(entry: &ArchiveEntry, source: &Header) -> Result<Header> {
    let mut header = Header::new_gnu();

    let entry_type = match entry.kind {
        EntryKind::File => EntryType::Regular,
        EntryKind::Directory => EntryType::Directory,
        EntryKind::Symlink { .. } => EntryType::Symlink,
        EntryKind::Hardlink { .. } => EntryType::Link,
        EntryKind::Other => source.entry_type(),
    };
    header.set_entry_type(entry_type);
    header.set_size(if entry.kind.carries_content() { entry.size } else { 0 });
    header.set_mode(entry.mode);
    header.set_uid(entry.uid);
    header.set_gid(entry.gid);
    header.set_mtime(entry.mtime);

    if let Ok(Some(name)) = source.username() {
        header.set_username(name)?;
    }
    if let Ok(Some(name)) = source.groupname() {
        header.set_groupname(name)?;
    }
    if let (Ok(Some(major)), Ok(Some(minor))) = (source.device_major(), source.device_minor()) {
        header.set_device_major(major)?;
        header.set_device_minor(minor)?;
    }

    Ok(header)
}

fn append_descriptor<W: Write>(
    builder: &mut tar::Builder<W>,
    descriptor: &BuildDescriptor,
) -> Result<()> {
    let content = descriptor.content.as_bytes();
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    builder.append_data(&mut header, &descriptor.name, content)?;
    debug!(name = %descriptor.name, "appended build descriptor");
    Ok(())
}
