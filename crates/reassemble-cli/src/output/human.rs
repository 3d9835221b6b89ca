//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use reassemble_core::ExtractionReport;
use reassemble_core::PruneOutcome;
use reassemble_core::ReassembleReport;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn headline(&self, text: &str) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {text}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(text);
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(
        &self,
        image: &str,
        output: &Path,
        report: &ExtractionReport,
    ) -> Result<()> {
        for blocked in &report.blocked {
            self.format_warning(&format!(
                "skipped {}: {}",
                blocked.path.display(),
                blocked.reason
            ));
        }

        if self.quiet {
            return Ok(());
        }

        self.headline(&format!("Extracted {image} into {}", output.display()));
        let _ = self
            .term
            .write_line(&format!("  Files extracted: {}", report.files_extracted));
        let _ = self
            .term
            .write_line(&format!("  Directories: {}", report.directories_created));
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            Self::format_size(report.bytes_written)
        ));
        if report.has_blocked() {
            let _ = self
                .term
                .write_line(&format!("  Blocked entries: {}", report.blocked.len()));
        }

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Symlinks: {}", report.symlinks_created));
            let _ = self
                .term
                .write_line(&format!("  Hardlinks: {}", report.hardlinks_created));
            let _ = self
                .term
                .write_line(&format!("  Unsupported entries: {}", report.unsupported));
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }

        Ok(())
    }

    fn format_audit_result(&self, threshold: u64, outcome: &PruneOutcome) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if outcome.records.is_empty() {
            self.headline(&format!(
                "No files larger than {}",
                Self::format_size(threshold)
            ));
            return Ok(());
        }

        let _ = self.term.write_line(&format!(
            "Files larger than {}: {}",
            Self::format_size(threshold),
            outcome.records.len()
        ));
        for record in &outcome.records {
            let removed = outcome.removed.iter().any(|r| r.path == record.path);
            let marker = match (removed, self.use_colors) {
                (true, true) => style("removed").red().to_string(),
                (true, false) => "removed".to_string(),
                (false, _) => "kept".to_string(),
            };
            let _ = self.term.write_line(&format!(
                "  {:>10}  {}  [{marker}]",
                Self::format_size(record.size),
                record.path.display()
            ));
        }

        Ok(())
    }

    fn format_reassemble_result(&self, tag: &str, report: &ReassembleReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(&format!("Built image {tag}"));
        let _ = self
            .term
            .write_line(&format!("  Image ID: {}", report.build.image_id));
        let _ = self.term.write_line(&format!(
            "  Entries kept: {} of {}",
            report.rebuild.entries_kept, report.rebuild.entries_read
        ));
        let _ = self.term.write_line(&format!(
            "  Context size: {}",
            Self::format_size(report.rebuild.bytes_compressed)
        ));

        if self.verbose {
            let _ = self.term.write_line(&format!(
                "  Entries excluded: {}",
                report.rebuild.entries_excluded
            ));
            let _ = self.term.write_line(&format!(
                "  Uncompressed content: {}",
                Self::format_size(report.rebuild.bytes_copied)
            ));
            for line in report.build.logs.lines() {
                let _ = self.term.write_line(&format!("  | {line}"));
            }
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always shown, even in quiet mode
        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}
