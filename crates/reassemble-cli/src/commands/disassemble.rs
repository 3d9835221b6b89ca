//! Disassemble, prune and optionally rebuild an image.

use crate::cli::DisassembleArgs;
use crate::commands::prune_selector;
use crate::error::convert_error;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use reassemble_core::ExclusionRules;
use reassemble_core::ExtractOptions;
use reassemble_core::NoopProgress;
use reassemble_core::ProgressCallback;
use reassemble_core::RebuildConfig;
use reassemble_core::audit_and_prune;
use reassemble_core::disassemble;
use reassemble_core::engine::ContainerEngine;
use reassemble_core::reassemble;
use reassemble_core::types::ExtractionTarget;
use std::path::PathBuf;
use tracing::info;

/// Output switches shared with the top-level flags.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
}

pub fn execute<E: ContainerEngine + ?Sized>(
    args: &DisassembleArgs,
    engine: &E,
    formatter: &dyn OutputFormatter,
    mode: OutputMode,
) -> Result<()> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let target = ExtractionTarget::new(&output_dir).with_context(|| {
        format!(
            "Cannot use '{}' as the output directory",
            output_dir.display()
        )
    })?;

    let options = ExtractOptions {
        preserve_permissions: !args.no_preserve_permissions,
    };

    let mut progress: Box<dyn ProgressCallback> =
        if !mode.quiet && !mode.json && CliProgress::should_show() {
            Box::new(CliProgress::new("Extracting"))
        } else {
            Box::new(NoopProgress)
        };
    let report = disassemble(engine, &args.image, &target, &options, progress.as_mut())
        .map_err(|e| convert_error(e, &args.image))?;
    drop(progress);
    formatter.format_extraction_result(&args.image, target.as_path(), &report)?;

    let Some(threshold) = args.maximum_file_size else {
        return Ok(());
    };

    let mut selector = prune_selector(args.yes_to_none, mode.json);
    let outcome = audit_and_prune(target.as_path(), threshold, selector.as_mut())
        .map_err(|e| convert_error(e, &args.image))?;
    formatter.format_audit_result(threshold, &outcome)?;

    let Some(new_name) = &args.new_image_name else {
        return Ok(());
    };

    let config = RebuildConfig::default();
    let rules = ExclusionRules::from_records(&config, &target, &outcome.removed);
    info!(
        removed = rules.removed_count(),
        "excluding removed files from the new image"
    );
    let result = reassemble(engine, &args.image, new_name, &rules, &config.descriptor)
        .map_err(|e| convert_error(e, &args.image))?;
    formatter.format_reassemble_result(new_name, &result)
}
