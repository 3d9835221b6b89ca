//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use reassemble_core::ExtractionReport;
use reassemble_core::LargeFileRecord;
use reassemble_core::PruneOutcome;
use reassemble_core::ReassembleReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct FileRecord {
    path: String,
    size: u64,
}

impl From<&LargeFileRecord> for FileRecord {
    fn from(record: &LargeFileRecord) -> Self {
        Self {
            path: record.path.display().to_string(),
            size: record.size,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(
        &self,
        image: &str,
        output: &Path,
        report: &ExtractionReport,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct Blocked {
            path: String,
            reason: String,
        }

        #[derive(Serialize)]
        struct ExtractionOutput {
            image: String,
            output_dir: String,
            files_extracted: usize,
            directories_created: usize,
            symlinks_created: usize,
            hardlinks_created: usize,
            bytes_written: u64,
            unsupported: usize,
            blocked: Vec<Blocked>,
            duration_ms: u128,
        }

        let data = ExtractionOutput {
            image: image.to_string(),
            output_dir: output.display().to_string(),
            files_extracted: report.files_extracted,
            directories_created: report.directories_created,
            symlinks_created: report.symlinks_created,
            hardlinks_created: report.hardlinks_created,
            bytes_written: report.bytes_written,
            unsupported: report.unsupported,
            blocked: report
                .blocked
                .iter()
                .map(|b| Blocked {
                    path: b.path.display().to_string(),
                    reason: b.reason.to_string(),
                })
                .collect(),
            duration_ms: report.duration.as_millis(),
        };

        Self::output(&JsonOutput::success("disassemble", data))
    }

    fn format_audit_result(&self, threshold: u64, outcome: &PruneOutcome) -> Result<()> {
        #[derive(Serialize)]
        struct AuditOutput {
            threshold: u64,
            large_files: Vec<FileRecord>,
            removed: Vec<FileRecord>,
        }

        let data = AuditOutput {
            threshold,
            large_files: outcome.records.iter().map(FileRecord::from).collect(),
            removed: outcome.removed.iter().map(FileRecord::from).collect(),
        };

        Self::output(&JsonOutput::success("audit", data))
    }

    fn format_reassemble_result(&self, tag: &str, report: &ReassembleReport) -> Result<()> {
        #[derive(Serialize)]
        struct ReassembleOutput {
            tag: String,
            image_id: String,
            entries_read: usize,
            entries_kept: usize,
            entries_excluded: usize,
            bytes_copied: u64,
            context_bytes: u64,
            duration_ms: u128,
        }

        let data = ReassembleOutput {
            tag: tag.to_string(),
            image_id: report.build.image_id.clone(),
            entries_read: report.rebuild.entries_read,
            entries_kept: report.rebuild.entries_kept,
            entries_excluded: report.rebuild.entries_excluded,
            bytes_copied: report.rebuild.bytes_copied,
            context_bytes: report.rebuild.bytes_compressed,
            duration_ms: report.rebuild.duration.as_millis(),
        };

        Self::output(&JsonOutput::success("reassemble", data))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::error("error", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_record_serialization() {
        let record = LargeFileRecord {
            path: PathBuf::from("/out/var/lib/blob"),
            size: 4096,
        };
        let json = serde_json::to_string(&FileRecord::from(&record)).unwrap();
        assert_eq!(json, r#"{"path":"/out/var/lib/blob","size":4096}"#);
    }

    #[test]
    fn test_error_envelope() {
        let json = serde_json::to_value(JsonOutput::error("error", "boom")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "boom");
        assert!(json.get("data").is_none());
    }
}
