//! Output formatter trait for CLI results.

use anyhow::Result;
use reassemble_core::ExtractionReport;
use reassemble_core::PruneOutcome;
use reassemble_core::ReassembleReport;
use serde::Serialize;
use std::path::Path;

/// Renders the result of each pipeline stage
pub trait OutputFormatter {
    /// Image filesystem extracted into `output`
    fn format_extraction_result(
        &self,
        image: &str,
        output: &Path,
        report: &ExtractionReport,
    ) -> Result<()>;

    /// Large files found above `threshold` and which of them were removed
    fn format_audit_result(&self, threshold: u64, outcome: &PruneOutcome) -> Result<()>;

    /// New image built under `tag`
    fn format_reassemble_result(&self, tag: &str, report: &ReassembleReport) -> Result<()>;

    /// Format error message
    fn format_error(&self, error: &anyhow::Error);

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}

impl JsonOutput<()> {
    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
