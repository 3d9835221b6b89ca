//! End-to-end disassemble and reassemble operations.
//!
//! Each operation owns a [`SnapshotSession`] for its whole duration, so the
//! transient container and snapshot file are gone by the time it returns,
//! whether it succeeds or fails.

use std::io::Seek;
use std::path::Path;

use tracing::debug;
use tracing::info;

use crate::BuildDescriptor;
use crate::ExclusionRules;
use crate::ExtractOptions;
use crate::Result;
use crate::audit::LargeFileRecord;
use crate::audit::find_large_files;
use crate::engine::BuildOutcome;
use crate::engine::ContainerEngine;
use crate::extract::extract_snapshot;
use crate::prune::PruneSelector;
use crate::prune::apply_decision;
use crate::rebuild::rebuild_archive;
use crate::report::ExtractionReport;
use crate::report::ProgressCallback;
use crate::report::RebuildReport;
use crate::session::SnapshotSession;
use crate::types::ExtractionTarget;

/// Findings of an audit and what the operator removed.
#[derive(Debug, Clone, Default)]
pub struct PruneOutcome {
    /// Every file above the threshold, in discovery order.
    pub records: Vec<LargeFileRecord>,

    /// The subset deleted from disk.
    pub removed: Vec<LargeFileRecord>,
}

/// Result of a successful reassembly.
#[derive(Debug, Clone)]
pub struct ReassembleReport {
    /// Statistics of the filtered archive handed to the build.
    pub rebuild: RebuildReport,

    /// Output of the build.
    pub build: BuildOutcome,
}

/// Exports `image` from the engine and extracts its filesystem into
/// `target`.
///
/// # Errors
///
/// Engine failures, `ReassembleError::ArchiveFormat` for an unreadable
/// snapshot, and any extraction error. Partial output is left in place.
pub fn disassemble<E: ContainerEngine + ?Sized>(
    engine: &E,
    image: &str,
    target: &ExtractionTarget,
    options: &ExtractOptions,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    engine.ping()?;

    let mut session = SnapshotSession::new(engine);
    let archive = session.acquire_snapshot(image)?;
    let report = extract_snapshot(&archive, target, options, progress)?;

    info!(image, output = %target.as_path().display(), "image filesystem extracted");
    Ok(report)
}

/// Audits `root` against `threshold` and lets `selector` choose files to
/// delete.
///
/// The selector is not consulted when nothing exceeds the threshold.
///
/// # Errors
///
/// Returns an error if the audit root is unreadable, the selector fails or
/// a deletion fails.
pub fn audit_and_prune(
    root: &Path,
    threshold: u64,
    selector: &mut dyn PruneSelector,
) -> Result<PruneOutcome> {
    info!(threshold, "checking for large files");
    let records = find_large_files(root, threshold)?;
    if records.is_empty() {
        return Ok(PruneOutcome::default());
    }

    let decision = selector.request_selection(&records)?;
    let removed = apply_decision(&records, &decision)?;
    Ok(PruneOutcome { records, removed })
}

/// Builds `new_tag` from a fresh export of `image`, filtered by `rules`.
///
/// The snapshot is exported again rather than reusing an earlier
/// extraction, so the new image carries the original metadata of every
/// kept entry.
///
/// # Errors
///
/// Engine failures, `ReassembleError::ArchiveIntegrity` if the snapshot is
/// inconsistent, and `ReassembleError::BuildFailure` if the build fails.
pub fn reassemble<E: ContainerEngine + ?Sized>(
    engine: &E,
    image: &str,
    new_tag: &str,
    rules: &ExclusionRules,
    descriptor: &BuildDescriptor,
) -> Result<ReassembleReport> {
    engine.ping()?;
    info!(image, new_tag, "creating filtered image");

    let mut session = SnapshotSession::new(engine);
    let archive = session.acquire_snapshot(image)?;

    let mut context = tempfile::tempfile()?;
    let rebuild = rebuild_archive(&archive, descriptor, |entry| rules.keep(entry), &mut context)?;
    context.rewind()?;

    let build = engine.build_image(&mut context, new_tag)?;
    for line in build.logs.lines() {
        debug!(target: "reassemble::build", "{line}");
    }
    info!(new_tag, image_id = %build.image_id, "new image created");

    Ok(ReassembleReport { rebuild, build })
}
