//! Human-readable output formatter with colors and styling.

use super::formatter::DIAGNOSTIC_PREFIX;
use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use mandump_core::Diagnostic;
use mandump_core::DumpConfig;
use mandump_core::HarvestReport;
use mandump_core::formats::PackageDescriptor;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn format_size(bytes: u64) -> String {
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

    fn package_line(package: &PackageDescriptor) -> String {
        format!("{} @ {}", package.label(), package.sha256)
    }

    fn diagnostic_line(diagnostic: &Diagnostic) -> String {
        format!("{DIAGNOSTIC_PREFIX}: {diagnostic}")
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_package(&self, package: &PackageDescriptor) {
        if self.quiet {
            return;
        }
        let line = Self::package_line(package);
        if self.use_colors {
            let _ = self.term.write_line(&style(line).bold().to_string());
        } else {
            let _ = self.term.write_line(&line);
        }
    }

    fn format_extracted(&self, path: &Path) {
        if self.quiet {
            return;
        }
        let _ = self.term.write_line(&format!("\t{}", path.display()));
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) {
        let line = Self::diagnostic_line(diagnostic);
        if self.use_colors && diagnostic.policy_violation {
            let _ = self.err_term.write_line(&style(line).yellow().to_string());
        } else {
            let _ = self.err_term.write_line(&line);
        }
    }

    fn format_harvest_result(&self, config: &DumpConfig, report: &HarvestReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let extraction = &report.extraction;
        let headline = format!(
            "Harvest complete: {} extracted, {} cached, {} failed",
            report.packages_extracted, report.cache_hits, report.packages_failed
        );
        if self.use_colors {
            let mark = if report.has_problems() {
                style("!").yellow().bold()
            } else {
                style("✓").green().bold()
            };
            let _ = self.term.write_line(&format!("{mark} {headline}"));
        } else {
            let _ = self.term.write_line(&headline);
        }

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Output directory: {}", config.output_dir.display()));
            let _ = self
                .term
                .write_line(&format!("  Indices:          {}", report.indices_processed));
            let _ = self
                .term
                .write_line(&format!("  Packages seen:    {}", report.packages_seen));
            let _ = self
                .term
                .write_line(&format!("  Without pages:    {}", report.packages_empty));
            let _ = self.term.write_line(&format!(
                "  Files:            {}",
                extraction.files_extracted
            ));
            let _ = self.term.write_line(&format!(
                "  Links:            {} symlinks, {} hardlinks",
                extraction.symlinks_created, extraction.hardlinks_created
            ));
            let _ = self.term.write_line(&format!(
                "  Skipped entries:  {}",
                extraction.entries_skipped
            ));
            let _ = self.term.write_line(&format!(
                "  Total size:       {}",
                Self::format_size(extraction.bytes_written)
            ));
            let _ = self
                .term
                .write_line(&format!("  Duration:         {:?}", extraction.duration));
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        let line = format!("{DIAGNOSTIC_PREFIX}: {error:#}");
        if self.use_colors {
            let _ = self.err_term.write_line(&style(line).red().to_string());
        } else {
            let _ = self.err_term.write_line(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandump_core::DumpError;

    #[test]
    fn test_format_size() {
        assert_eq!(HumanFormatter::format_size(512), "512 B");
        assert_eq!(HumanFormatter::format_size(2048), "2.0 KB");
        assert_eq!(HumanFormatter::format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_package_line() {
        let package = PackageDescriptor::new("mdocml-1.14.6_3", "x86_64", "c0ffee");
        assert_eq!(
            HumanFormatter::package_line(&package),
            "mdocml-1.14.6_3.x86_64 @ c0ffee"
        );
    }

    #[test]
    fn test_diagnostic_line() {
        let diagnostic = Diagnostic::new("/repo/foo-1.0_1.x86_64.xbps", &DumpError::MissingManifest);
        assert_eq!(
            HumanFormatter::diagnostic_line(&diagnostic),
            "mandump: /repo/foo-1.0_1.x86_64.xbps: no files.plist in package"
        );
    }
}
