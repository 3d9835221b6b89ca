//! Size audit of an already extracted tree.

use crate::cli::AuditArgs;
use crate::commands::prune_selector;
use crate::error::convert_local_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use reassemble_core::PruneOutcome;
use reassemble_core::audit_and_prune;
use reassemble_core::find_large_files;

pub fn execute(args: &AuditArgs, formatter: &dyn OutputFormatter, json: bool) -> Result<()> {
    let outcome = if args.prune {
        let mut selector = prune_selector(false, json);
        audit_and_prune(&args.dir, args.maximum_file_size, selector.as_mut())
            .map_err(convert_local_error)?
    } else {
        PruneOutcome {
            records: find_large_files(&args.dir, args.maximum_file_size)
                .map_err(convert_local_error)?,
            removed: Vec::new(),
        }
    };

    formatter.format_audit_result(args.maximum_file_size, &outcome)
}
