//! Run orchestration: indices, state lookup, manifest matching, extraction.

use std::path::Path;

use tracing::debug;
use tracing::info;

use crate::Diagnostic;
use crate::DumpConfig;
use crate::DumpError;
use crate::ExtractionReport;
use crate::ExtractionState;
use crate::HarvestReport;
use crate::Reporter;
use crate::Result;
use crate::extraction::SelectiveExtractor;
use crate::formats::PackageDescriptor;
use crate::formats::match_files;
use crate::formats::read_manifest;
use crate::formats::read_repodata_file;
use crate::types::DestDir;
use crate::types::WantedSet;

/// Drives a complete harvest over one or more repository indices.
///
/// # Examples
///
/// ```no_run
/// use mandump_core::DumpConfig;
/// use mandump_core::Harvester;
/// use mandump_core::NoopReporter;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DumpConfig::default().with_output_dir("/srv/man");
/// let harvester = Harvester::new(config)?;
/// let report = harvester.run(&["/repo/x86_64-repodata"], &mut NoopReporter)?;
/// println!("{} packages extracted", report.packages_extracted);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Harvester {
    config: DumpConfig,
    dest: DestDir,
}

enum PackageOutcome {
    /// Manifest has no path under the prefix.
    Empty,
    Extracted {
        paths: Vec<String>,
        report: ExtractionReport,
    },
}

impl Harvester {
    /// Creates a harvester, creating the output directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the output directory cannot be created or
    /// exists but is not a directory.
    pub fn new(config: DumpConfig) -> Result<Self> {
        let dest = DestDir::create(&config.output_dir)?;
        Ok(Self { config, dest })
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &DumpConfig {
        &self.config
    }

    /// Loads the state, harvests every index, and saves the new state.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::StateCorrupt` if the existing state cannot be
    /// loaded, `DumpError::IndexUnreadable` if an index cannot be read, or
    /// `DumpError::StateWrite` if the new state cannot be saved. Package failures are
    /// not errors; they are reported and retried on the next run.
    pub fn run<P: AsRef<Path>>(
        &self,
        indices: &[P],
        reporter: &mut dyn Reporter,
    ) -> Result<HarvestReport> {
        let state_path = self.config.state_path();
        let previous = ExtractionState::load(&state_path)?;

        let (next, report) = self.harvest(&previous, indices, reporter)?;

        next.save(&state_path)?;
        info!(
            packages = next.len(),
            extracted = report.packages_extracted,
            failed = report.packages_failed,
            "harvest complete"
        );
        reporter.on_complete(&report);
        Ok(report)
    }

    /// Harvests every index against `previous` and returns the new state.
    ///
    /// The new state contains exactly the hashes seen in `indices` that
    /// were either cached in `previous` or processed successfully now.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::IndexUnreadable` for the first index that cannot
    /// be opened or decoded.
    pub fn harvest<P: AsRef<Path>>(
        &self,
        previous: &ExtractionState,
        indices: &[P],
        reporter: &mut dyn Reporter,
    ) -> Result<(ExtractionState, HarvestReport)> {
        let mut next = ExtractionState::new();
        let mut report = HarvestReport::new();

        for index_path in indices {
            let index_path = index_path.as_ref();
            let repodata =
                read_repodata_file(index_path).map_err(|e| DumpError::IndexUnreadable {
                    path: index_path.to_path_buf(),
                    source: Box::new(e),
                })?;
            report.indices_processed += 1;
            debug!(
                index = %index_path.display(),
                packages = repodata.index.len(),
                signed = repodata.signing.is_some(),
                "read repository index"
            );

            let repo_dir = match index_path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };

            for package in repodata.index.values() {
                report.packages_seen += 1;
                let hash = package.sha256.as_str();

                if let Some(paths) = previous.get(hash) {
                    next.insert(hash, paths.to_vec());
                    report.cache_hits += 1;
                    continue;
                }
                if next.contains(hash) {
                    report.cache_hits += 1;
                    continue;
                }

                let archive_path = repo_dir.join(package.archive_file_name());
                match self.process_package(package, &archive_path, reporter) {
                    Ok(PackageOutcome::Empty) => {
                        next.insert(hash, Vec::new());
                        report.packages_empty += 1;
                    }
                    Ok(PackageOutcome::Extracted {
                        paths,
                        report: extraction,
                    }) => {
                        next.insert(hash, paths);
                        report.packages_extracted += 1;
                        report.extraction.merge(&extraction);
                    }
                    Err(err) => {
                        debug!(package = %package.label(), error = %err, "package failed");
                        let diagnostic = Diagnostic::new(archive_path.display().to_string(), &err);
                        reporter.on_diagnostic(&diagnostic);
                        report.diagnostics.push(diagnostic);
                        report.packages_failed += 1;
                    }
                }
            }
        }

        Ok((next, report))
    }

    fn process_package(
        &self,
        package: &PackageDescriptor,
        archive_path: &Path,
        reporter: &mut dyn Reporter,
    ) -> Result<PackageOutcome> {
        let manifest = read_manifest(archive_path)?;
        let matched = match_files(&manifest, &self.config.prefix);
        if matched.is_empty() {
            debug!(package = %package.label(), "no paths under prefix");
            return Ok(PackageOutcome::Empty);
        }

        reporter.on_package(package);
        let mut wanted: WantedSet = matched.iter().cloned().collect();
        let report = SelectiveExtractor::new(&self.dest, &self.config.prefix).extract_file(
            archive_path,
            &mut wanted,
            reporter,
        )?;

        Ok(PackageOutcome::Extracted {
            paths: matched,
            report,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::CollectingReporter;
    use crate::NoopReporter;
    use crate::test_utils::PackageBuilder;
    use crate::test_utils::RepodataBuilder;
    use crate::test_utils::descriptor;
    use tempfile::TempDir;

    fn harvester(out: &Path) -> Harvester {
        Harvester::new(DumpConfig::default().with_output_dir(out)).unwrap()
    }

    #[test]
    fn test_new_creates_output_dir() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("nested/out");
        let harvester = harvester(&out);
        assert!(out.is_dir());
        assert_eq!(harvester.config().output_dir, out);
    }

    #[test]
    fn test_cache_hit_skips_missing_archive() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        std::fs::create_dir(&repo).unwrap();
        let index = RepodataBuilder::new()
            .add_package("foo", descriptor("foo-1.0_1", "x86_64", "aaaa"))
            .write_to(&repo, "x86_64-repodata");

        let mut previous = ExtractionState::new();
        previous.insert("aaaa", vec!["/usr/share/man/man1/foo.1".into()]);

        let (next, report) = harvester(&temp.path().join("out"))
            .harvest(&previous, &[index], &mut NoopReporter)
            .unwrap();

        assert_eq!(next, previous);
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.packages_failed, 0);
    }

    #[test]
    fn test_missing_archive_is_package_failure() {
        let temp = TempDir::new().unwrap();
        let index = RepodataBuilder::new()
            .add_package("foo", descriptor("foo-1.0_1", "x86_64", "aaaa"))
            .write_to(temp.path(), "x86_64-repodata");
        let mut reporter = CollectingReporter::new();

        let (next, report) = harvester(&temp.path().join("out"))
            .harvest(&ExtractionState::new(), &[index], &mut reporter)
            .unwrap();

        assert!(next.is_empty());
        assert_eq!(report.packages_failed, 1);
        assert!(reporter.diagnostics[0].context.ends_with("foo-1.0_1.x86_64.xbps"));
    }

    #[test]
    fn test_package_without_pages_recorded_empty() {
        let temp = TempDir::new().unwrap();
        let pkg = descriptor("foo-1.0_1", "x86_64", "aaaa");
        PackageBuilder::new()
            .add_file("/usr/bin/foo", b"\x7fELF")
            .write_to(temp.path(), &pkg);
        let index = RepodataBuilder::new()
            .add_package("foo", pkg)
            .write_to(temp.path(), "x86_64-repodata");
        let mut reporter = CollectingReporter::new();

        let (next, report) = harvester(&temp.path().join("out"))
            .harvest(&ExtractionState::new(), &[index], &mut reporter)
            .unwrap();

        assert_eq!(next.get("aaaa"), Some(&[][..]));
        assert_eq!(report.packages_empty, 1);
        assert!(reporter.packages.is_empty());
    }

    #[test]
    fn test_unreadable_index_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = harvester(&temp.path().join("out")).harvest(
            &ExtractionState::new(),
            &[temp.path().join("missing-repodata")],
            &mut NoopReporter,
        );

        let err = result.unwrap_err();
        assert!(err.is_fatal_for_run());
        assert!(err.to_string().starts_with("parse "));
    }
}
