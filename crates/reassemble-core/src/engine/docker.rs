//! `docker` command-line adapter.

use std::fs::File;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;

use tracing::debug;

use super::BuildOutcome;
use super::ContainerEngine;
use super::ContainerId;
use crate::ReassembleError;
use crate::Result;

/// Default client binary, resolved through `PATH`.
pub const DEFAULT_ENGINE_BIN: &str = "docker";

/// Engine adapter that shells out to a Docker-compatible client.
///
/// Any client accepting the same subcommands (`podman`, `nerdctl`) works.
///
/// # Examples
///
/// ```no_run
/// use reassemble_core::engine::ContainerEngine;
/// use reassemble_core::engine::DockerCli;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = DockerCli::new("podman");
/// engine.ping()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    /// Creates an adapter invoking `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns the client binary path.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, args: &[&str]) -> Command {
        debug!(binary = %self.binary.display(), ?args, "running engine command");
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).stdin(Stdio::null());
        cmd
    }

    fn unavailable(&self, e: &std::io::Error) -> ReassembleError {
        ReassembleError::EngineUnavailable {
            reason: format!("cannot run {}: {e}", self.binary.display()),
        }
    }

    fn spawn(&self, cmd: &mut Command) -> Result<Child> {
        cmd.spawn().map_err(|e| self.unavailable(&e))
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        self.command(args)
            .output()
            .map_err(|e| self.unavailable(&e))
    }

    /// Runs a command and returns its trimmed stdout, mapping a non-zero
    /// exit to `ReassembleError::Engine`.
    fn run(&self, operation: &str, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(ReassembleError::Engine {
                command: operation.to_string(),
                message: stderr_text(&output.stderr),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_BIN)
    }
}

fn stderr_text(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr).trim().to_string()
}

impl ContainerEngine for DockerCli {
    fn ping(&self) -> Result<()> {
        let output = self.output(&["version", "--format", "{{.Server.Version}}"])?;
        if !output.status.success() {
            return Err(ReassembleError::EngineUnavailable {
                reason: stderr_text(&output.stderr),
            });
        }
        debug!(
            server = %String::from_utf8_lossy(&output.stdout).trim(),
            "engine reachable"
        );
        Ok(())
    }

    fn image_exists(&self, image: &str) -> Result<bool> {
        let output = self.output(&["image", "inspect", "--format", "{{.Id}}", image])?;
        if !output.status.success() {
            debug!(image, stderr = %stderr_text(&output.stderr), "image not present locally");
        }
        Ok(output.status.success())
    }

    fn pull_image(&self, image: &str) -> Result<()> {
        let output = self.output(&["pull", image])?;
        if !output.status.success() {
            return Err(ReassembleError::ImageNotFound {
                image: image.to_string(),
                reason: stderr_text(&output.stderr),
            });
        }
        Ok(())
    }

    fn create_container(&self, image: &str) -> Result<ContainerId> {
        // The command is never executed; it only satisfies images that
        // declare neither an entrypoint nor a default command.
        let id = self.run("create", &["create", image, "true"])?;
        if id.is_empty() {
            return Err(ReassembleError::Engine {
                command: "create".to_string(),
                message: "engine returned no container id".to_string(),
            });
        }
        Ok(ContainerId::new(id))
    }

    fn export_container(&self, id: &ContainerId, writer: &mut dyn Write) -> Result<u64> {
        // stderr goes to a file: it is only read after stdout reaches EOF.
        let mut errors = tempfile::tempfile()?;
        let mut child = self.spawn(
            self.command(&["export", id.as_str()])
                .stdout(Stdio::piped())
                .stderr(Stdio::from(errors.try_clone()?)),
        )?;

        let copied = match child.stdout.take() {
            Some(mut stdout) => std::io::copy(&mut stdout, writer),
            None => Ok(0),
        };

        let status = child.wait()?;
        if !status.success() {
            return Err(ReassembleError::Engine {
                command: "export".to_string(),
                message: read_logs(&mut errors)?.trim().to_string(),
            });
        }
        Ok(copied?)
    }

    fn remove_container(&self, id: &ContainerId) -> Result<()> {
        self.run("rm", &["rm", "--force", id.as_str()])?;
        Ok(())
    }

    fn build_image(&self, context: &mut dyn Read, tag: &str) -> Result<BuildOutcome> {
        let iidfile = tempfile::NamedTempFile::new()?;
        let iid_path = iidfile.path().to_string_lossy().into_owned();

        // Logs go to a file so a chatty build cannot stall on a full pipe
        // while the context is still being written.
        let mut logs = tempfile::tempfile()?;
        let mut child = self.spawn(
            self.command(&["build", "--tag", tag, "--iidfile", &iid_path, "-"])
                .stdin(Stdio::piped())
                .stdout(Stdio::from(logs.try_clone()?))
                .stderr(Stdio::from(logs.try_clone()?)),
        )?;

        let sent = match child.stdin.take() {
            Some(mut stdin) => std::io::copy(context, &mut stdin).map(|_| ()),
            None => Ok(()),
        };
        let status = child.wait()?;
        let logs = read_logs(&mut logs)?;

        if !status.success() {
            return Err(ReassembleError::BuildFailure {
                tag: tag.to_string(),
                message: logs,
            });
        }
        sent?;

        let image_id = std::fs::read_to_string(iidfile.path())?.trim().to_string();
        Ok(BuildOutcome { image_id, logs })
    }
}

fn read_logs(file: &mut File) -> Result<String> {
    file.rewind()?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
