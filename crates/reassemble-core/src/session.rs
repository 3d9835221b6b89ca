//! Transient resources of one pipeline run.
//!
//! A run owns at most one transient container and one local snapshot file.
//! Each handle is recorded the moment it is acquired, so whatever was
//! acquired before a failure is released when the session drops, and
//! nothing that was never acquired is touched.

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::Result;
use crate::archive::SnapshotArchive;
use crate::engine::ContainerEngine;
use crate::engine::ContainerId;

/// Scoped owner of the transient container and snapshot file.
///
/// # Examples
///
/// ```no_run
/// use reassemble_core::SnapshotSession;
/// use reassemble_core::engine::DockerCli;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = DockerCli::default();
/// let mut session = SnapshotSession::new(&engine);
/// let archive = session.acquire_snapshot("alpine:3.20")?;
/// println!("{} entries", archive.entries()?.len());
/// // container removed and snapshot deleted here
/// # Ok(())
/// # }
/// ```
pub struct SnapshotSession<'e, E: ContainerEngine + ?Sized> {
    engine: &'e E,
    temp_dir: Option<PathBuf>,
    container: Option<ContainerId>,
    snapshot: Option<NamedTempFile>,
}

impl<'e, E: ContainerEngine + ?Sized> SnapshotSession<'e, E> {
    /// Creates a session that has acquired nothing yet.
    pub fn new(engine: &'e E) -> Self {
        Self {
            engine,
            temp_dir: None,
            container: None,
            snapshot: None,
        }
    }

    /// Places the snapshot file in `dir` instead of the system temp
    /// directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Returns the transient container, if one was created.
    pub fn container(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    /// Returns the snapshot file path, if one was created.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_ref().map(NamedTempFile::path)
    }

    /// Makes sure `image` is available locally, pulling it if needed.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::ImageNotFound` if the pull fails.
    pub fn ensure_image(&self, image: &str) -> Result<()> {
        if self.engine.image_exists(image)? {
            info!(image, "image found locally");
            return Ok(());
        }
        info!(image, "image not found locally, pulling");
        self.engine.pull_image(image)
    }

    /// Exports the filesystem of `image` into a local snapshot file.
    ///
    /// Pulls the image if needed, creates a transient container from it and
    /// streams the container's filesystem to a temporary `.tar` file. Calling
    /// this again releases the previous container and snapshot first.
    ///
    /// # Errors
    ///
    /// Propagates engine failures; the session still releases whatever was
    /// acquired when it drops.
    pub fn acquire_snapshot(&mut self, image: &str) -> Result<SnapshotArchive> {
        self.release();
        self.ensure_image(image)?;

        let id = self.engine.create_container(image)?;
        debug!(container = id.short(), "created transient container");
        let id = self.container.insert(id).clone();

        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("reassemble-").suffix(".tar");
            builder
        };
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let file = self.snapshot.insert(file);

        let bytes = self.engine.export_container(&id, file.as_file_mut())?;
        file.as_file_mut().flush()?;
        debug!(path = %file.path().display(), bytes, "filesystem snapshot saved");

        SnapshotArchive::open(file.path())
    }

    /// Removes the container and deletes the snapshot file, whichever
    /// exist. Safe to call repeatedly; failures are logged, not returned.
    pub fn release(&mut self) {
        if let Some(id) = self.container.take() {
            match self.engine.remove_container(&id) {
                Ok(()) => debug!(container = id.short(), "removed transient container"),
                Err(e) => warn!(container = id.short(), error = %e, "failed to remove transient container"),
            }
        }
        if let Some(file) = self.snapshot.take() {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => debug!(path = %path.display(), "deleted snapshot file"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete snapshot file"),
            }
        }
    }
}

impl<E: ContainerEngine + ?Sized> Drop for SnapshotSession<'_, E> {
    fn drop(&mut self) {
        self.release();
    }
}
