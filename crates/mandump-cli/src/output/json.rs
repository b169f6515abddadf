//! JSON output formatter for machine-readable results.

use super::formatter::DIAGNOSTIC_PREFIX;
use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use mandump_core::Diagnostic;
use mandump_core::DumpConfig;
use mandump_core::HarvestReport;
use mandump_core::formats::PackageDescriptor;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

/// Emits one JSON document on stdout at the end of the run.
///
/// Progress events are not printed; diagnostics still go to stderr so the
/// stdout document stays parseable.
pub struct JsonFormatter;

#[derive(Serialize)]
struct HarvestOutput<'a> {
    output_dir: String,
    prefix: &'a str,
    #[serde(flatten)]
    report: &'a HarvestReport,
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_package(&self, _package: &PackageDescriptor) {}

    fn format_extracted(&self, _path: &Path) {}

    fn format_diagnostic(&self, diagnostic: &Diagnostic) {
        let _ = writeln!(io::stderr(), "{DIAGNOSTIC_PREFIX}: {diagnostic}");
    }

    fn format_harvest_result(&self, config: &DumpConfig, report: &HarvestReport) -> Result<()> {
        let data = HarvestOutput {
            output_dir: config.output_dir.display().to_string(),
            prefix: &config.prefix,
            report,
        };
        Self::output(&JsonOutput::success("dump", data))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("dump", format!("{error:#}"));
        let _ = Self::output(&output);
    }
}
