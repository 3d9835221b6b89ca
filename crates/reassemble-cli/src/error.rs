//! Error conversion utilities for CLI.
//!
//! Turns reassemble-core's typed errors into contextual anyhow errors with
//! a `HINT:` line where there is something the operator can do about it.

use anyhow::anyhow;
use reassemble_core::ReassembleError;

/// Converts `ReassembleError` to a user-facing anyhow error for `image`
pub fn convert_error(err: ReassembleError, image: &str) -> anyhow::Error {
    let hint = err.hint();
    let message = match err {
        ReassembleError::EngineUnavailable { reason } => {
            format!("Cannot reach the container engine: {reason}")
        }
        ReassembleError::ImageNotFound { image, reason } => {
            format!("Image '{image}' could not be pulled: {reason}")
        }
        ReassembleError::BuildFailure { tag, message } => {
            format!("Build of '{tag}' from '{image}' failed:\n{}", message.trim_end())
        }
        ReassembleError::ArchiveIntegrity {
            path,
            expected,
            actual,
        } => format!(
            "Snapshot of '{image}' is inconsistent at '{path}': expected {expected} bytes, got {actual}"
        ),
        ReassembleError::Extraction { path, source } => {
            format!("Failed to write '{}': {source}", path.display())
        }
        other => format!("{other} (image '{image}')"),
    };

    match hint {
        Some(hint) => anyhow!("{message}\nHINT: {hint}"),
        None => anyhow!("{message}"),
    }
}

/// Adds a hint to errors that carry no image context
pub fn convert_local_error(err: ReassembleError) -> anyhow::Error {
    match err.hint() {
        Some(hint) => anyhow!("{err}\nHINT: {hint}"),
        None => anyhow!(err),
    }
}
