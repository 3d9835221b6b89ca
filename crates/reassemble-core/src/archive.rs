//! Snapshot archive reader.
//!
//! A snapshot is the filesystem archive a container engine streams out of a
//! container: a plain tar, or a gzip-compressed tar when it is the output of
//! a previous rebuild. The reader re-opens the file for every pass, so the
//! extractor and the rebuilder can each walk the same snapshot from the
//! start.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use flate2::read::GzDecoder;

use crate::ReassembleError;
use crate::Result;
use crate::types::ArchiveEntry;
use crate::types::EntryKind;
use crate::types::normalize_entry_path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression layer around the tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotCompression {
    /// Uncompressed tar.
    None,
    /// Gzip-compressed tar.
    Gzip,
}

/// One entry handed to a [`SnapshotArchive::for_each_entry`] visitor.
pub struct SnapshotEntry<'a> {
    /// Path exactly as recorded in the archive.
    pub raw_path: PathBuf,

    /// Parsed metadata, or `None` when the raw path climbs above the
    /// archive root and has no normalized form.
    pub entry: Option<ArchiveEntry>,

    /// Header as stored, for fields `ArchiveEntry` does not model (owner
    /// names, device numbers, the raw entry type).
    pub header: tar::Header,

    /// Content reader; yields nothing for non-file entries.
    pub content: &'a mut dyn Read,
}

/// A snapshot archive on local disk.
///
/// # Examples
///
/// ```no_run
/// use reassemble_core::SnapshotArchive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = SnapshotArchive::open("/tmp/snapshot.tar")?;
/// for entry in archive.entries()? {
///     println!("{} ({} bytes)", entry.path, entry.size);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotArchive {
    path: PathBuf,
    compression: SnapshotCompression,
}

impl SnapshotArchive {
    /// Opens a snapshot and detects its compression from the magic bytes.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::ArchiveFormat` if the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = File::open(&path).map_err(|e| {
            ReassembleError::ArchiveFormat(format!("cannot open {}: {e}", path.display()))
        })?;

        let mut magic = [0u8; 2];
        let mut filled = 0;
        while filled < magic.len() {
            match file.read(&mut magic[filled..])? {
                0 => break,
                n => filled += n,
            }
        }

        let compression = if filled == magic.len() && magic == GZIP_MAGIC {
            SnapshotCompression::Gzip
        } else {
            SnapshotCompression::None
        };

        Ok(Self { path, compression })
    }

    /// Returns the snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the detected compression.
    #[must_use]
    pub const fn compression(&self) -> SnapshotCompression {
        self.compression
    }

    fn reopen(&self) -> Result<Box<dyn Read>> {
        let file = File::open(&self.path).map_err(|e| {
            ReassembleError::ArchiveFormat(format!("cannot reopen {}: {e}", self.path.display()))
        })?;
        let reader = BufReader::new(file);
        Ok(match self.compression {
            SnapshotCompression::None => Box::new(reader),
            SnapshotCompression::Gzip => Box::new(GzDecoder::new(reader)),
        })
    }

    /// Walks every entry from the start of the archive.
    ///
    /// Each call re-opens the file. Entries are visited in archive order.
    /// Returns the number of entries visited.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::ArchiveFormat` if the stream is not a tar
    /// container or an entry header is malformed, and propagates any error
    /// returned by `visit`.
    pub fn for_each_entry<F>(&self, mut visit: F) -> Result<usize>
    where
        F: FnMut(SnapshotEntry<'_>) -> Result<()>,
    {
        let mut archive = tar::Archive::new(self.reopen()?);
        let entries = archive.entries().map_err(|e| {
            ReassembleError::ArchiveFormat(format!("failed to read tar entries: {e}"))
        })?;

        let mut visited = 0;
        for entry_result in entries {
            let mut tar_entry = entry_result.map_err(|e| {
                ReassembleError::ArchiveFormat(format!("failed to read tar entry: {e}"))
            })?;

            let raw_path = tar_entry
                .path()
                .map_err(|e| ReassembleError::ArchiveFormat(format!("invalid entry path: {e}")))?
                .into_owned();
            let entry = parse_entry(&tar_entry, &raw_path)?;
            let header = tar_entry.header().clone();

            visit(SnapshotEntry {
                raw_path,
                entry,
                header,
                content: &mut tar_entry,
            })?;
            visited += 1;
        }

        Ok(visited)
    }

    /// Collects metadata for every entry with a normalized path.
    ///
    /// Entries that climb above the archive root are left out.
    ///
    /// # Errors
    ///
    /// Same as [`Self::for_each_entry`].
    pub fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        let mut collected = Vec::new();
        self.for_each_entry(|item| {
            if let Some(entry) = item.entry {
                collected.push(entry);
            }
            Ok(())
        })?;
        Ok(collected)
    }
}

fn parse_entry<R: Read>(tar_entry: &tar::Entry<'_, R>, raw_path: &Path) -> Result<Option<ArchiveEntry>> {
    let Some(path) = normalize_entry_path(raw_path) else {
        return Ok(None);
    };

    let header = tar_entry.header();
    let raw = header.as_old();
    let invalid =
        |field: &str, e: std::io::Error| ReassembleError::ArchiveFormat(format!("invalid {field} for {}: {e}", raw_path.display()));

    let link_name = tar_entry
        .link_name()
        .map_err(|e| invalid("link target", e))?
        .map(std::borrow::Cow::into_owned);

    Ok(Some(ArchiveEntry {
        path,
        kind: EntryKind::from_tar(header, link_name),
        size: tar_entry.size(),
        mode: numeric_or_zero(header.mode(), &raw.mode).map_err(|e| invalid("mode", e))?,
        uid: numeric_or_zero(header.uid(), &raw.uid).map_err(|e| invalid("uid", e))?,
        gid: numeric_or_zero(header.gid(), &raw.gid).map_err(|e| invalid("gid", e))?,
        mtime: numeric_or_zero(header.mtime(), &raw.mtime).map_err(|e| invalid("mtime", e))?,
    }))
}

/// Reads an unset numeric header field (all NUL or blank) as zero.
fn numeric_or_zero<T: Default>(value: std::io::Result<T>, raw: &[u8]) -> std::io::Result<T> {
    match value {
        Err(_) if raw.iter().all(|&b| b == 0 || b == b' ') => Ok(T::default()),
        other => other,
    }
}
