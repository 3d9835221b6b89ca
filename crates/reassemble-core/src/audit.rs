//! Size auditing of an extracted filesystem tree.

use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::info;
use tracing::warn;
use walkdir::WalkDir;

use crate::Result;

/// A file found above the size threshold.
///
/// Records are referenced by their position in the audit result, so the
/// order of the returned vector is meaningful to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeFileRecord {
    /// Absolute path of the file on disk.
    pub path: PathBuf,

    /// File size in bytes.
    pub size: u64,
}

/// Walks `root` and returns every regular file strictly larger than
/// `threshold` bytes.
///
/// Traversal is directory-first and top-down; entries inside a directory
/// come in the order the filesystem returns them, so callers must not rely
/// on sorted output. Symlinks are not followed. A file that vanishes
/// between listing and measuring is skipped.
///
/// # Errors
///
/// Returns `ReassembleError::Io` if `root` itself cannot be read.
///
/// # Examples
///
/// ```no_run
/// use reassemble_core::find_large_files;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// for record in find_large_files("./rootfs", 100 * 1024 * 1024)? {
///     println!("{} ({} bytes)", record.path.display(), record.size);
/// }
/// # Ok(())
/// # }
/// ```
pub fn find_large_files(root: impl AsRef<Path>, threshold: u64) -> Result<Vec<LargeFileRecord>> {
    let root = root.as_ref();
    // Surface an unreadable root as an error instead of an empty audit.
    std::fs::read_dir(root)?;

    let mut records = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable path during audit");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "skipping file without metadata");
                continue;
            }
        };

        if size > threshold {
            warn!(path = %entry.path().display(), size, threshold, "file exceeds size threshold");
            records.push(LargeFileRecord {
                path: entry.into_path(),
                size,
            });
        }
    }

    if records.is_empty() {
        info!(threshold, "no files exceed the size threshold");
    }

    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_sized(root: &Path, relative: &str, size: usize) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; size]).unwrap();
    }

    #[test]
    fn test_threshold_is_strict() {
        let temp = TempDir::new().unwrap();
        write_sized(temp.path(), "equal.bin", 100);
        write_sized(temp.path(), "over.bin", 101);
        write_sized(temp.path(), "under.bin", 99);

        let records = find_large_files(temp.path(), 100).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].path.ends_with("over.bin"));
        assert_eq!(records[0].size, 101);
    }

    #[test]
    fn test_nested_files_found() {
        let temp = TempDir::new().unwrap();
        write_sized(temp.path(), "var/log/huge.log", 2048);
        write_sized(temp.path(), "etc/passwd", 10);

        let records = find_large_files(temp.path(), 1024).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].path.ends_with("var/log/huge.log"));
        assert!(records[0].path.starts_with(temp.path()));
    }

    #[test]
    fn test_directories_never_reported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/b/c")).unwrap();
        assert!(find_large_files(temp.path(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_result_is_not_error() {
        let temp = TempDir::new().unwrap();
        write_sized(temp.path(), "small", 1);
        assert!(find_large_files(temp.path(), 1024).unwrap().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinks_not_followed() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        write_sized(outside.path(), "big", 4096);
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();

        assert!(find_large_files(temp.path(), 1024).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(find_large_files(temp.path().join("absent"), 0).is_err());
    }
}
