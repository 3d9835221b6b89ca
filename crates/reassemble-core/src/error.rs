//! Error types for disassembly and reassembly operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ReassembleError`.
pub type Result<T> = std::result::Result<T, ReassembleError>;

/// Errors that can occur while disassembling or reassembling an image.
#[derive(Error, Debug)]
pub enum ReassembleError {
    /// I/O operation failed outside of entry extraction.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container engine could not be reached.
    #[error("container engine unavailable: {reason}")]
    EngineUnavailable {
        /// Why the engine could not be reached.
        reason: String,
    },

    /// The image is not present locally and could not be pulled.
    #[error("image not found: {image} ({reason})")]
    ImageNotFound {
        /// The image reference.
        image: String,
        /// Pull failure reported by the engine.
        reason: String,
    },

    /// An engine command failed for a reason other than availability.
    #[error("engine command `{command}` failed: {message}")]
    Engine {
        /// The engine operation that failed.
        command: String,
        /// Diagnostic output from the engine.
        message: String,
    },

    /// The snapshot stream is not a readable archive.
    #[error("invalid snapshot archive: {0}")]
    ArchiveFormat(String),

    /// Disk-level failure while materializing an entry.
    #[error("failed to extract {path}: {source}")]
    Extraction {
        /// Entry path relative to the extraction root.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Entry content length did not match its header during rebuild.
    #[error("integrity error in {path}: header claims {expected} bytes, read {actual}")]
    ArchiveIntegrity {
        /// Entry path inside the archive.
        path: String,
        /// Size recorded in the entry header.
        expected: u64,
        /// Bytes actually read from the entry.
        actual: u64,
    },

    /// A size string could not be parsed.
    #[error("invalid size format: {input:?} (expected digits with optional K, M or G suffix)")]
    InvalidSizeFormat {
        /// The rejected input.
        input: String,
    },

    /// Operator input to the prune prompt was malformed.
    #[error("invalid selection: {reason}")]
    InvalidSelection {
        /// Description of the problem.
        reason: String,
    },

    /// The external build step reported failure.
    #[error("build of {tag} failed: {message}")]
    BuildFailure {
        /// Tag that was being built.
        tag: String,
        /// Build output reported by the engine, verbatim.
        message: String,
    },
}

impl ReassembleError {
    /// Returns `true` if this error must terminate the run.
    ///
    /// Size strings and prompt input are recovered locally by rejecting the
    /// argument or re-prompting; everything else halts the pipeline.
    ///
    /// # Examples
    ///
    /// ```
    /// use reassemble_core::ReassembleError;
    ///
    /// let err = ReassembleError::InvalidSizeFormat { input: "abc".into() };
    /// assert!(!err.is_fatal());
    ///
    /// let err = ReassembleError::ArchiveFormat("truncated header".into());
    /// assert!(err.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InvalidSizeFormat { .. } | Self::InvalidSelection { .. }
        )
    }

    /// Returns operator guidance for this error, if any.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EngineUnavailable { .. } => {
                Some("Is the engine daemon running? Use --engine-bin to point at another client.")
            }
            Self::ImageNotFound { .. } => {
                Some("Check the image reference and registry credentials.")
            }
            Self::ArchiveFormat(_) => {
                Some("The engine returned something that is not a tar stream.")
            }
            Self::Extraction { .. } => {
                Some("Check free disk space and write permissions on the output directory.")
            }
            Self::ArchiveIntegrity { .. } => {
                Some("The snapshot is truncated or corrupted. Re-run to export a fresh one.")
            }
            Self::InvalidSizeFormat { .. } => Some("Examples: 512, 10K, 100M, 1G."),
            _ => None,
        }
    }
}
