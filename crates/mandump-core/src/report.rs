//! Run statistics and progress callbacks.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::DumpError;
use crate::formats::PackageDescriptor;

/// A non-fatal problem encountered while harvesting.
///
/// Diagnostics cover rejected links, unsupported entries, individual file
/// failures and whole packages that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Where the problem occurred: a package archive path or an output path.
    pub context: String,

    /// What went wrong.
    pub message: String,

    /// Whether the entry was rejected by link or path policy.
    pub policy_violation: bool,
}

impl Diagnostic {
    /// Builds a diagnostic from an error.
    #[must_use]
    pub fn new(context: impl Into<String>, error: &DumpError) -> Self {
        Self {
            context: context.into(),
            message: error.to_string(),
            policy_violation: error.is_policy_violation(),
        }
    }

    /// Builds a diagnostic for an error with no meaningful location.
    ///
    /// Policy errors already name the offending path in their message.
    #[must_use]
    pub fn bare(error: &DumpError) -> Self {
        Self::new(String::new(), error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.context, self.message)
        }
    }
}

/// Statistics for the extraction of a single package.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Regular files written.
    pub files_extracted: usize,

    /// Symlinks created.
    pub symlinks_created: usize,

    /// Hardlinks created, including those resolved after the scan.
    pub hardlinks_created: usize,

    /// Hardlinks that had to wait for their target.
    pub hardlinks_deferred: usize,

    /// Total bytes of regular file data written.
    pub bytes_written: u64,

    /// Wanted entries that were not materialized.
    pub entries_skipped: usize,

    /// Problems reported while extracting.
    pub diagnostics: Vec<Diagnostic>,

    /// Wall time spent extracting.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a skipped entry.
    pub fn skip(&mut self, diagnostic: Diagnostic) {
        self.entries_skipped += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Number of paths materialized in the output directory.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted + self.symlinks_created + self.hardlinks_created
    }

    /// Returns whether any diagnostics were generated.
    #[must_use]
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Adds the counters of `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        self.files_extracted += other.files_extracted;
        self.symlinks_created += other.symlinks_created;
        self.hardlinks_created += other.hardlinks_created;
        self.hardlinks_deferred += other.hardlinks_deferred;
        self.bytes_written = self.bytes_written.saturating_add(other.bytes_written);
        self.entries_skipped += other.entries_skipped;
        self.diagnostics.extend(other.diagnostics.iter().cloned());
        self.duration += other.duration;
    }
}

/// Statistics for a whole harvest run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestReport {
    /// Repository indices read.
    pub indices_processed: usize,

    /// Package descriptors seen across all indices.
    pub packages_seen: usize,

    /// Packages skipped because their hash was already in the state.
    pub cache_hits: usize,

    /// Packages with at least one wanted path that were extracted.
    pub packages_extracted: usize,

    /// Packages whose manifest had no path under the prefix.
    pub packages_empty: usize,

    /// Packages that could not be opened or read.
    pub packages_failed: usize,

    /// Combined statistics of every extraction.
    pub extraction: ExtractionReport,

    /// Package-level problems (unreadable archives and manifests).
    pub diagnostics: Vec<Diagnostic>,
}

impl HarvestReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every diagnostic of the run, package-level first.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .chain(self.extraction.diagnostics.iter())
    }

    /// Returns `true` if any package failed or any entry was skipped.
    #[must_use]
    pub fn has_problems(&self) -> bool {
        self.packages_failed > 0 || self.extraction.has_diagnostics()
    }
}

/// Receives progress events during a harvest.
///
/// Implement this trait to render progress, e.g. the `pkgver.arch @ hash`
/// header per package followed by one line per written path. The trait
/// requires `Send` so a reporter can live on another thread.
///
/// # Examples
///
/// ```
/// use mandump_core::Diagnostic;
/// use mandump_core::HarvestReport;
/// use mandump_core::Reporter;
/// use mandump_core::formats::PackageDescriptor;
/// use std::path::Path;
///
/// struct Plain;
///
/// impl Reporter for Plain {
///     fn on_package(&mut self, pkg: &PackageDescriptor) {
///         println!("{} @ {}", pkg.label(), pkg.sha256);
///     }
///
///     fn on_extracted(&mut self, path: &Path) {
///         println!("\t{}", path.display());
///     }
///
///     fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
///         eprintln!("mandump: {diagnostic}");
///     }
///
///     fn on_complete(&mut self, _report: &HarvestReport) {}
/// }
/// ```
pub trait Reporter: Send {
    /// Called before a package with wanted paths is extracted.
    fn on_package(&mut self, package: &PackageDescriptor);

    /// Called after a path has been written into the output directory.
    fn on_extracted(&mut self, path: &Path);

    /// Called for every non-fatal problem, as it happens.
    fn on_diagnostic(&mut self, diagnostic: &Diagnostic);

    /// Called once after the state has been saved.
    fn on_complete(&mut self, report: &HarvestReport);
}

/// Reporter that ignores every event.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn on_package(&mut self, _package: &PackageDescriptor) {}

    fn on_extracted(&mut self, _path: &Path) {}

    fn on_diagnostic(&mut self, _diagnostic: &Diagnostic) {}

    fn on_complete(&mut self, _report: &HarvestReport) {}
}

/// Reporter that records every event, for tests and embedding.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    /// Labels of packages announced, in order.
    pub packages: Vec<String>,
    /// Output paths written, in order.
    pub extracted: Vec<std::path::PathBuf>,
    /// Diagnostics received, in order.
    pub diagnostics: Vec<Diagnostic>,
    /// Whether `on_complete` was called.
    pub completed: bool,
}

impl CollectingReporter {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for CollectingReporter {
    fn on_package(&mut self, package: &PackageDescriptor) {
        self.packages.push(package.label());
    }

    fn on_extracted(&mut self, path: &Path) {
        self.extracted.push(path.to_path_buf());
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }

    fn on_complete(&mut self, _report: &HarvestReport) {
        self.completed = true;
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_new_report() {
        let report = ExtractionReport::new();
        assert_eq!(report.files_extracted, 0);
        assert_eq!(report.bytes_written, 0);
        assert!(!report.has_diagnostics());
    }

    #[test]
    fn test_skip_records_diagnostic() {
        let mut report = ExtractionReport::new();
        let err = DumpError::SymlinkEscape {
            path: PathBuf::from("out/man1/bar.1"),
            target: PathBuf::from("../../etc/passwd"),
        };
        report.skip(Diagnostic::bare(&err));

        assert_eq!(report.entries_skipped, 1);
        assert!(report.diagnostics[0].policy_violation);
        assert_eq!(
            report.diagnostics[0].to_string(),
            "skipping symlink: out/man1/bar.1 -> ../../etc/passwd"
        );
    }

    #[test]
    fn test_total_items() {
        let mut report = ExtractionReport::new();
        report.files_extracted = 10;
        report.symlinks_created = 5;
        report.hardlinks_created = 2;
        assert_eq!(report.total_items(), 17);
    }

    #[test]
    fn test_merge() {
        let mut total = ExtractionReport::new();
        let mut one = ExtractionReport::new();
        one.files_extracted = 2;
        one.bytes_written = 100;
        one.skip(Diagnostic::new("pkg.xbps", &DumpError::MissingManifest));
        total.merge(&one);
        total.merge(&one);

        assert_eq!(total.files_extracted, 4);
        assert_eq!(total.bytes_written, 200);
        assert_eq!(total.entries_skipped, 2);
        assert_eq!(total.diagnostics.len(), 2);
    }

    #[test]
    fn test_diagnostic_display_with_context() {
        let diag = Diagnostic::new("/repo/foo-1.0_1.x86_64.xbps", &DumpError::MissingManifest);
        assert_eq!(
            diag.to_string(),
            "/repo/foo-1.0_1.x86_64.xbps: no files.plist in package"
        );
        assert!(!diag.policy_violation);
    }

    #[test]
    fn test_harvest_report_problems() {
        let mut report = HarvestReport::new();
        assert!(!report.has_problems());
        report.packages_failed = 1;
        assert!(report.has_problems());
    }

    #[test]
    fn test_report_serializes() {
        let report = HarvestReport::new();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["packages_seen"], 0);
        assert_eq!(json["extraction"]["duration"], 0);
    }

    #[test]
    fn test_collecting_reporter() {
        let mut reporter = CollectingReporter::new();
        let pkg = PackageDescriptor::new("foo-1.0_1", "x86_64", "abcd");
        reporter.on_package(&pkg);
        reporter.on_extracted(Path::new("out/man1/foo.1"));
        reporter.on_complete(&HarvestReport::new());

        assert_eq!(reporter.packages, ["foo-1.0_1.x86_64"]);
        assert_eq!(reporter.extracted.len(), 1);
        assert!(reporter.completed);
    }
}
