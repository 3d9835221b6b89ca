//! Resolved extraction root.

use crate::Result;
use std::path::Path;
use std::path::PathBuf;

/// A canonical directory that a snapshot is extracted into.
///
/// Construction creates the directory (and its parents) if it does not
/// exist, then canonicalizes it. Every path the extractor writes is checked
/// against this canonical root, so a symlinked output directory is resolved
/// once up front.
///
/// # Examples
///
/// ```no_run
/// use reassemble_core::types::ExtractionTarget;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let target = ExtractionTarget::new("./rootfs")?;
/// assert!(target.as_path().is_absolute());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTarget(PathBuf);

impl ExtractionTarget {
    /// Creates the target, making the directory tree if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but is not a directory, or if it
    /// cannot be created or canonicalized.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if path.exists() && !path.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("output path is not a directory: {}", path.display()),
            )
            .into());
        }

        std::fs::create_dir_all(&path)?;

        let canonical = path.canonicalize().map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize path {}: {e}", path.display()),
            )
        })?;

        Ok(Self(canonical))
    }

    /// Returns the canonical root path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins a normalized relative entry path to the root.
    #[inline]
    #[must_use]
    pub fn join(&self, relative: &str) -> PathBuf {
        self.0.join(relative)
    }

    /// Returns `true` if `path` is the root or a strict descendant of it.
    ///
    /// Component-wise comparison, so `/out-other` is not inside `/out`.
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.0)
    }

    /// Converts a path below the root into its archive-relative form.
    ///
    /// Returns `None` for paths outside the root.
    #[must_use]
    pub fn relative(&self, path: &Path) -> Option<String> {
        let stripped = path.strip_prefix(&self.0).ok()?;
        super::normalize_entry_path(stripped)
    }

    /// Converts into the inner `PathBuf`.
    #[inline]
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}
