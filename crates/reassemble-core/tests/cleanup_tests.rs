//! Transient resources are released on every exit path.
//!
//! The temp directory override is process-wide, so this file holds a single
//! test that walks the scenarios in sequence.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::FakeEngine;
use reassemble_core::BuildDescriptor;
use reassemble_core::ExclusionRules;
use reassemble_core::ExtractOptions;
use reassemble_core::NoopProgress;
use reassemble_core::ReassembleError;
use reassemble_core::disassemble;
use reassemble_core::reassemble;
use reassemble_core::test_utils::TarTestBuilder;
use reassemble_core::types::ExtractionTarget;
use std::path::Path;
use tempfile::TempDir;

fn leftover_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_cleanup_guarantee() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    tempfile::env::override_temp_dir(scratch.path()).unwrap();
    let target = ExtractionTarget::new(output.path()).unwrap();

    let good = TarTestBuilder::new().add_file("etc/hostname", b"box").build();
    let truncated = TarTestBuilder::new().build_truncated("bin/tool", b"abc", 2048);

    // Success.
    let engine = FakeEngine::with_snapshot(good.clone());
    disassemble(&engine, "app:1", &target, &ExtractOptions::default(), &mut NoopProgress).unwrap();
    assert_eq!(engine.live_containers(), 0);
    assert!(leftover_files(scratch.path()).is_empty());

    // Failure after both resources were acquired.
    let engine = FakeEngine::with_snapshot(truncated.clone());
    let err = disassemble(&engine, "app:1", &target, &ExtractOptions::default(), &mut NoopProgress)
        .unwrap_err();
    assert!(matches!(err, ReassembleError::ArchiveIntegrity { .. }));
    assert_eq!(engine.live_containers(), 0);
    assert!(leftover_files(scratch.path()).is_empty());

    // Failure during the rebuild pass.
    let engine = FakeEngine::with_snapshot(truncated);
    let err = reassemble(
        &engine,
        "app:1",
        "app:slim",
        &ExclusionRules::default(),
        &BuildDescriptor::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ReassembleError::ArchiveIntegrity { .. }));
    assert_eq!(engine.live_containers(), 0);
    assert!(leftover_files(scratch.path()).is_empty());

    // Failure at the build step.
    let engine = FakeEngine {
        fail_build: true,
        ..FakeEngine::with_snapshot(good)
    };
    assert!(
        reassemble(
            &engine,
            "app:1",
            "app:slim",
            &ExclusionRules::default(),
            &BuildDescriptor::default(),
        )
        .is_err()
    );
    assert_eq!(engine.live_containers(), 0);
    assert!(leftover_files(scratch.path()).is_empty());

    // Failure before any resource exists.
    let engine = FakeEngine {
        local_images: Vec::new(),
        fail_pull: true,
        ..Default::default()
    };
    assert!(disassemble(&engine, "ghost:1", &target, &ExtractOptions::default(), &mut NoopProgress).is_err());
    assert!(engine.calls().iter().all(|c| !c.starts_with("rm")));
    assert!(leftover_files(scratch.path()).is_empty());
}
