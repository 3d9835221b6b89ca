//! Scripted container engine shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use reassemble_core::ReassembleError;
use reassemble_core::Result;
use reassemble_core::engine::BuildOutcome;
use reassemble_core::engine::ContainerEngine;
use reassemble_core::engine::ContainerId;
use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io::Read;
use std::io::Write;

/// In-memory engine: every container exports the same snapshot bytes and
/// every build context is captured.
#[derive(Default)]
pub struct FakeEngine {
    pub snapshot: Vec<u8>,
    pub local_images: Vec<String>,
    pub unreachable: bool,
    pub fail_pull: bool,
    pub fail_build: bool,
    pub calls: RefCell<Vec<String>>,
    pub live: RefCell<BTreeSet<String>>,
    pub contexts: RefCell<Vec<Vec<u8>>>,
    pub next_id: Cell<u32>,
}

impl FakeEngine {
    pub fn with_snapshot(snapshot: Vec<u8>) -> Self {
        Self {
            snapshot,
            local_images: vec!["app:1".to_string()],
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn live_containers(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn last_context(&self) -> Vec<u8> {
        self.contexts.borrow().last().cloned().unwrap()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }
}

impl ContainerEngine for FakeEngine {
    fn ping(&self) -> Result<()> {
        if self.unreachable {
            return Err(ReassembleError::EngineUnavailable {
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn image_exists(&self, image: &str) -> Result<bool> {
        Ok(self.local_images.iter().any(|i| i == image))
    }

    fn pull_image(&self, image: &str) -> Result<()> {
        self.record(format!("pull {image}"));
        if self.fail_pull {
            return Err(ReassembleError::ImageNotFound {
                image: image.to_string(),
                reason: "manifest unknown".to_string(),
            });
        }
        Ok(())
    }

    fn create_container(&self, _image: &str) -> Result<ContainerId> {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        let id = format!("container-{n}");
        self.record(format!("create {id}"));
        self.live.borrow_mut().insert(id.clone());
        Ok(ContainerId::new(id))
    }

    fn export_container(&self, _id: &ContainerId, writer: &mut dyn Write) -> Result<u64> {
        writer.write_all(&self.snapshot)?;
        Ok(self.snapshot.len() as u64)
    }

    fn remove_container(&self, id: &ContainerId) -> Result<()> {
        self.record(format!("rm {id}"));
        self.live.borrow_mut().remove(id.as_str());
        Ok(())
    }

    fn build_image(&self, context: &mut dyn Read, tag: &str) -> Result<BuildOutcome> {
        let mut bytes = Vec::new();
        context.read_to_end(&mut bytes)?;
        self.contexts.borrow_mut().push(bytes);
        self.record(format!("build {tag}"));
        if self.fail_build {
            return Err(ReassembleError::BuildFailure {
                tag: tag.to_string(),
                message: "COPY failed: file not found".to_string(),
            });
        }
        Ok(BuildOutcome {
            image_id: "sha256:5eed".to_string(),
            logs: "Step 1/2 : FROM scratch\nStep 2/2 : COPY . /\n".to_string(),
        })
    }
}
