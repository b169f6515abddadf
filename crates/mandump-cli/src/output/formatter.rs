//! Output formatter trait for CLI results.

use anyhow::Result;
use mandump_core::Diagnostic;
use mandump_core::DumpConfig;
use mandump_core::HarvestReport;
use mandump_core::formats::PackageDescriptor;
use serde::Serialize;
use std::path::Path;

/// Common output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Announce a package about to be extracted
    fn format_package(&self, package: &PackageDescriptor);

    /// Report a path written into the output directory
    fn format_extracted(&self, path: &Path);

    /// Report a non-fatal problem
    fn format_diagnostic(&self, diagnostic: &Diagnostic);

    /// Format the run summary
    fn format_harvest_result(&self, config: &DumpConfig, report: &HarvestReport) -> Result<()>;

    /// Format a fatal error
    fn format_error(&self, error: &anyhow::Error);
}

/// Prefix of every diagnostic line on stderr.
pub const DIAGNOSTIC_PREFIX: &str = "mandump";

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

    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
