//! Snapshot archive entry metadata.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Kind of entry in a snapshot archive.
///
/// # Examples
///
/// ```
/// use reassemble_core::types::EntryKind;
/// use std::path::PathBuf;
///
/// let link = EntryKind::Symlink {
///     target: PathBuf::from("../lib/libc.so.6"),
/// };
/// assert!(link.is_symlink());
/// assert!(!link.carries_content());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file entry.
    File,

    /// Directory entry.
    Directory,

    /// Symbolic link entry.
    ///
    /// The target is stored as recorded in the archive and has NOT been
    /// validated.
    Symlink {
        /// The symlink target path (not yet validated).
        target: PathBuf,
    },

    /// Hard link entry pointing at another entry of the same archive.
    Hardlink {
        /// The linked entry path (not yet validated).
        target: PathBuf,
    },

    /// Device nodes, FIFOs and anything else without a portable
    /// filesystem representation.
    Other,
}

impl EntryKind {
    /// Returns `true` if this is a regular file.
    #[inline]
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns `true` if this is a directory.
    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink { .. })
    }

    /// Returns `true` if entries of this kind carry content bytes.
    #[inline]
    #[must_use]
    pub const fn carries_content(&self) -> bool {
        self.is_file()
    }

    pub(crate) fn from_tar(header: &tar::Header, link_name: Option<PathBuf>) -> Self {
        let kind = header.entry_type();
        if kind.is_dir() {
            Self::Directory
        } else if kind.is_file() || kind.is_contiguous() {
            Self::File
        } else if kind.is_symlink() {
            Self::Symlink {
                target: link_name.unwrap_or_default(),
            }
        } else if kind.is_hard_link() {
            Self::Hardlink {
                target: link_name.unwrap_or_default(),
            }
        } else {
            Self::Other
        }
    }
}

/// Metadata of one entry read from a snapshot archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalized relative path (`/`-separated, no leading separator).
    pub path: String,

    /// Entry kind, including the link target for links.
    pub kind: EntryKind,

    /// Size in bytes as recorded in the header.
    pub size: u64,

    /// Permission bits.
    pub mode: u32,

    /// Owning user id.
    pub uid: u64,

    /// Owning group id.
    pub gid: u64,

    /// Modification time in seconds since the epoch.
    pub mtime: u64,
}

impl ArchiveEntry {
    /// Returns `true` if the entry path starts with `prefix`.
    ///
    /// Plain string prefix semantics, so
    /// `var/log/` matches `var/log/syslog` but not `var/log` itself.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.path.starts_with(prefix)
    }
}

/// Normalizes a raw archive path into its relative form.
///
/// Leading separators and `.` components are dropped and the remaining
/// components are joined with `/`. Returns `None` when the path contains a
/// parent-directory component or a platform prefix, i.e. when it cannot be
/// expressed as a path below the archive root. The archive root itself
/// normalizes to an empty string.
///
/// # Examples
///
/// ```
/// use reassemble_core::types::normalize_entry_path;
/// use std::path::Path;
///
/// assert_eq!(normalize_entry_path(Path::new("/etc/passwd")).as_deref(), Some("etc/passwd"));
/// assert_eq!(normalize_entry_path(Path::new("./usr/bin/")).as_deref(), Some("usr/bin"));
/// assert_eq!(normalize_entry_path(Path::new("../etc/passwd")), None);
/// ```
#[must_use]
pub fn normalize_entry_path(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}
