//! Container engine boundary.
//!
//! The pipeline needs exactly four things from an engine: make sure an
//! image is present, turn it into a transient container, stream that
//! container's filesystem out as a tar, and build a new image from a tar
//! context. [`ContainerEngine`] is that surface; [`DockerCli`] implements it
//! on top of the `docker` command-line client.

mod docker;

use std::io::Read;
use std::io::Write;

pub use docker::DEFAULT_ENGINE_BIN;
pub use docker::DockerCli;

use crate::Result;

/// Identifier of a container created by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wraps an engine-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the full identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12-character short form used in logs.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Identifier of the built image.
    pub image_id: String,

    /// Build output, verbatim.
    pub logs: String,
}

/// Operations the pipeline needs from a container engine.
///
/// All calls block until the engine answers.
pub trait ContainerEngine {
    /// Checks that the engine is reachable.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::EngineUnavailable` if it is not.
    fn ping(&self) -> Result<()>;

    /// Returns `true` if `image` is present locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    fn image_exists(&self, image: &str) -> Result<bool>;

    /// Pulls `image` from its registry.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::ImageNotFound` if the pull fails.
    fn pull_image(&self, image: &str) -> Result<()>;

    /// Creates a stopped container from `image`.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::Engine` if creation fails.
    fn create_container(&self, image: &str) -> Result<ContainerId>;

    /// Streams the container's root filesystem as a tar into `writer` and
    /// returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::Engine` if the export fails and
    /// `ReassembleError::Io` if writing fails.
    fn export_container(&self, id: &ContainerId, writer: &mut dyn Write) -> Result<u64>;

    /// Removes a container, stopping it first if needed.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::Engine` if removal fails.
    fn remove_container(&self, id: &ContainerId) -> Result<()>;

    /// Builds an image tagged `tag` from a tar build context.
    ///
    /// # Errors
    ///
    /// Returns `ReassembleError::BuildFailure` with the build output if the
    /// build fails. Builds are never retried.
    fn build_image(&self, context: &mut dyn Read, tag: &str) -> Result<BuildOutcome>;
}
