//! Harvest command implementation.

use std::path::Path;

use anyhow::Result;
use mandump_core::Diagnostic;
use mandump_core::DumpConfig;
use mandump_core::HarvestReport;
use mandump_core::Harvester;
use mandump_core::Reporter;
use mandump_core::formats::PackageDescriptor;
use tracing::debug;

use crate::cli::Cli;
use crate::error::add_dump_context;
use crate::output::OutputFormatter;

/// Forwards harvest events to the selected output formatter.
struct FormatterReporter<'a> {
    formatter: &'a dyn OutputFormatter,
}

impl Reporter for FormatterReporter<'_> {
    fn on_package(&mut self, package: &PackageDescriptor) {
        self.formatter.format_package(package);
    }

    fn on_extracted(&mut self, path: &Path) {
        self.formatter.format_extracted(path);
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.formatter.format_diagnostic(diagnostic);
    }

    fn on_complete(&mut self, _report: &HarvestReport) {}
}

pub fn execute(cli: &Cli, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = DumpConfig::default()
        .with_output_dir(&cli.output_dir)
        .with_prefix(&cli.prefix);

    debug!(
        indices = cli.repodata.len(),
        output_dir = %cli.output_dir.display(),
        prefix = %cli.prefix,
        "starting harvest"
    );
    let harvester = add_dump_context(Harvester::new(config), &cli.output_dir)?;

    let mut reporter = FormatterReporter { formatter };
    let report = add_dump_context(
        harvester.run(&cli.repodata, &mut reporter),
        &cli.output_dir,
    )?;

    formatter.format_harvest_result(harvester.config(), &report)?;

    Ok(())
}
