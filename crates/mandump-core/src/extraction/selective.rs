//! Selective extraction of wanted entries from a package archive.

use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use tracing::debug;
use tracing::trace;

use super::common::create_hardlink;
use super::common::create_symlink;
use super::common::write_file;
use crate::Diagnostic;
use crate::DumpError;
use crate::ExtractionReport;
use crate::Reporter;
use crate::Result;
use crate::formats::archive_error;
use crate::formats::compression::open_decompressed;
use crate::security::HardlinkTracker;
use crate::security::validate_symlink;
use crate::types::DestDir;
use crate::types::EntryKind;
use crate::types::SafePath;
use crate::types::WantedSet;
use crate::types::normalize_entry_name;

/// Streams a package archive and materializes only wanted entries.
///
/// # Algorithm
///
/// 1. Each entry name is normalized (`./usr/...` becomes `/usr/...`).
/// 2. Entries not in the wanted set are skipped; a matching name is removed
///    from the set at once, so duplicate entries are handled only once.
/// 3. The prefix is stripped and the remainder joined under the output
///    directory.
/// 4. Regular files are copied, sibling symlinks recreated, and hardlinks
///    inside the prefix linked to their extracted target. Everything else
///    is skipped with a diagnostic.
///
/// The scan stops as soon as the wanted set is empty; the rest of the
/// stream is never decompressed. Hardlinks whose target has not been
/// written yet are retried once after the scan.
///
/// Entry-level failures become diagnostics in the returned report. Only a
/// broken container aborts extraction.
///
/// # Examples
///
/// ```no_run
/// use mandump_core::NoopReporter;
/// use mandump_core::extraction::SelectiveExtractor;
/// use mandump_core::types::DestDir;
/// use mandump_core::types::WantedSet;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/srv/man")?;
/// let extractor = SelectiveExtractor::new(&dest, "/usr/share/man/");
/// let mut wanted: WantedSet = ["/usr/share/man/man1/mandoc.1"].into_iter().collect();
///
/// let report = extractor.extract_file(
///     Path::new("/repo/mdocml-1.14.6_3.x86_64.xbps"),
///     &mut wanted,
///     &mut NoopReporter,
/// )?;
/// println!("{} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SelectiveExtractor<'a> {
    dest: &'a DestDir,
    prefix: &'a str,
}

impl<'a> SelectiveExtractor<'a> {
    /// Creates an extractor writing under `dest`, stripping `prefix`.
    #[must_use]
    pub const fn new(dest: &'a DestDir, prefix: &'a str) -> Self {
        Self { dest, prefix }
    }

    /// Opens a package archive and extracts the wanted entries from it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the archive cannot be opened, or the errors
    /// of [`SelectiveExtractor::extract`].
    pub fn extract_file(
        &self,
        archive_path: &Path,
        wanted: &mut WantedSet,
        reporter: &mut dyn Reporter,
    ) -> Result<ExtractionReport> {
        let file = File::open(archive_path)?;
        let mut archive = tar::Archive::new(open_decompressed(file)?);
        self.extract(&mut archive, wanted, reporter)
    }

    /// Extracts the wanted entries from an open tar stream.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::InvalidArchive` (or an I/O error) if the tar
    /// stream itself is corrupt. Problems with individual entries are
    /// reported as diagnostics instead.
    pub fn extract<R: Read>(
        &self,
        archive: &mut tar::Archive<R>,
        wanted: &mut WantedSet,
        reporter: &mut dyn Reporter,
    ) -> Result<ExtractionReport> {
        let start = Instant::now();
        let mut report = ExtractionReport::new();
        let mut hardlinks = HardlinkTracker::new();

        let mut entries = archive.entries().map_err(archive_error)?;
        while !wanted.is_empty() {
            let Some(entry) = entries.next() else {
                break;
            };
            let mut entry = entry.map_err(archive_error)?;

            let Ok(raw_name) = String::from_utf8(entry.path_bytes().into_owned()) else {
                continue;
            };
            let name = normalize_entry_name(&raw_name);
            if !wanted.take(name) {
                trace!(entry = name, "not wanted");
                continue;
            }

            if let Err(err) =
                self.extract_entry(&mut entry, name, &mut hardlinks, &mut report, reporter)
            {
                debug!(entry = name, error = %err, "skipping entry");
                let diagnostic = if err.is_policy_violation() {
                    Diagnostic::bare(&err)
                } else {
                    Diagnostic::new(name, &err)
                };
                reporter.on_diagnostic(&diagnostic);
                report.skip(diagnostic);
            }
        }

        self.resolve_deferred(&mut hardlinks, &mut report, reporter);

        if !wanted.is_empty() {
            debug!(missing = wanted.len(), "manifest paths absent from archive");
        }

        report.duration = start.elapsed();
        Ok(report)
    }

    fn extract_entry<R: Read>(
        &self,
        entry: &mut tar::Entry<'_, R>,
        name: &str,
        hardlinks: &mut HardlinkTracker,
        report: &mut ExtractionReport,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let kind = EntryKind::from_tar_entry(entry)?;
        let safe_path = SafePath::from_archive_name(name, self.prefix)?;

        match kind {
            EntryKind::File => {
                let written = write_file(entry, &safe_path, self.dest)?;
                report.files_extracted += 1;
                report.bytes_written = report.bytes_written.saturating_add(written);
                hardlinks.record_extracted(&safe_path);
                reporter.on_extracted(&self.dest.join(&safe_path));
            }
            EntryKind::Symlink { target } => {
                let symlink = validate_symlink(&safe_path, &target, self.dest)?;
                let created = create_symlink(&symlink, self.dest)?;
                report.symlinks_created += 1;
                hardlinks.record_extracted(&safe_path);
                reporter.on_extracted(&created);
            }
            EntryKind::Hardlink { target } => {
                let target =
                    hardlinks.validate_hardlink(&safe_path, &target, self.prefix, self.dest)?;
                // Outputs left by an earlier run are stale until rewritten.
                if hardlinks.is_extracted(&target) {
                    let created = create_hardlink(&safe_path, &target, self.dest)?;
                    report.hardlinks_created += 1;
                    hardlinks.record_extracted(&safe_path);
                    reporter.on_extracted(&created);
                } else {
                    debug!(link = name, "deferring hardlink until target is extracted");
                    report.hardlinks_deferred += 1;
                    hardlinks.defer(safe_path, target);
                }
            }
            EntryKind::Directory | EntryKind::Other { .. } => {
                return Err(DumpError::UnsupportedEntry {
                    path: name.to_string(),
                    kind: kind.to_string(),
                });
            }
        }
        Ok(())
    }

    fn resolve_deferred(
        &self,
        hardlinks: &mut HardlinkTracker,
        report: &mut ExtractionReport,
        reporter: &mut dyn Reporter,
    ) {
        for pending in hardlinks.take_deferred() {
            let result = if hardlinks.is_extracted(&pending.target) {
                create_hardlink(&pending.link, &pending.target, self.dest)
            } else {
                Err(DumpError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "hardlink target {} was not extracted",
                        pending.target.as_path().display()
                    ),
                )))
            };
            match result {
                Ok(created) => {
                    report.hardlinks_created += 1;
                    hardlinks.record_extracted(&pending.link);
                    reporter.on_extracted(&created);
                }
                Err(err) => {
                    let diagnostic =
                        Diagnostic::new(self.dest.join(&pending.link).display().to_string(), &err);
                    reporter.on_diagnostic(&diagnostic);
                    report.skip(diagnostic);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::CollectingReporter;
    use crate::NoopReporter;
    use crate::test_utils::PackageBuilder;
    use std::fs;
    use tempfile::TempDir;

    const PREFIX: &str = "/usr/share/man/";

    fn create_test_dest() -> (TempDir, DestDir) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::new(temp.path()).expect("failed to create dest");
        (temp, dest)
    }

    fn run(
        package: &[u8],
        dest: &DestDir,
        wanted: &mut WantedSet,
        reporter: &mut dyn Reporter,
    ) -> ExtractionReport {
        let mut archive = tar::Archive::new(open_decompressed(package).unwrap());
        SelectiveExtractor::new(dest, PREFIX)
            .extract(&mut archive, wanted, reporter)
            .unwrap()
    }

    #[test]
    fn test_extracts_only_wanted() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_file("/usr/bin/foo", b"\x7fELF")
            .add_file("/usr/share/man/man1/foo.1", b".TH FOO 1")
            .add_file("/usr/share/man/man5/foo.conf.5", b".TH FOO.CONF 5")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/foo.1"].into_iter().collect();

        let report = run(&package, &dest, &mut wanted, &mut NoopReporter);

        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.bytes_written, 9);
        assert!(wanted.is_empty());
        assert_eq!(
            fs::read(temp.path().join("man1/foo.1")).unwrap(),
            b".TH FOO 1"
        );
        assert!(!temp.path().join("man5").exists());
        assert!(!temp.path().join("bin").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_sibling_symlink_created() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_file("/usr/share/man/man1/foo.1", b"foo")
            .add_symlink("/usr/share/man/man1/bar.1", "foo.1")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/foo.1", "/usr/share/man/man1/bar.1"]
            .into_iter()
            .collect();
        let mut reporter = CollectingReporter::new();

        let report = run(&package, &dest, &mut wanted, &mut reporter);

        assert_eq!(report.symlinks_created, 1);
        assert_eq!(
            fs::read_link(temp.path().join("man1/bar.1")).unwrap(),
            Path::new("foo.1")
        );
        assert_eq!(reporter.extracted.len(), 2);
    }

    #[test]
    fn test_escaping_symlink_skipped() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_symlink("/usr/share/man/man1/evil.1", "../../../../etc/passwd")
            .add_symlink("/usr/share/man/man1/sub.1", "man8/sub.8")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/evil.1", "/usr/share/man/man1/sub.1"]
            .into_iter()
            .collect();
        let mut reporter = CollectingReporter::new();

        let report = run(&package, &dest, &mut wanted, &mut reporter);

        assert_eq!(report.symlinks_created, 0);
        assert_eq!(report.entries_skipped, 2);
        assert!(report.diagnostics.iter().all(|d| d.policy_violation));
        assert!(reporter.diagnostics[0].message.starts_with("skipping symlink: "));
        assert!(fs::symlink_metadata(temp.path().join("man1/evil.1")).is_err());
    }

    #[test]
    fn test_symlink_with_trailing_slash_skipped() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_file("/usr/share/man/man1/foo.1", b"foo")
            .add_symlink("/usr/share/man/man1/bar.1", "foo.1/")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/foo.1", "/usr/share/man/man1/bar.1"]
            .into_iter()
            .collect();
        let mut reporter = CollectingReporter::new();

        let report = run(&package, &dest, &mut wanted, &mut reporter);

        assert_eq!(report.symlinks_created, 0);
        assert_eq!(reporter.diagnostics.len(), 1);
        assert!(reporter.diagnostics[0].message.starts_with("skipping symlink: "));
        assert!(fs::symlink_metadata(temp.path().join("man1/bar.1")).is_err());
    }

    #[test]
    fn test_hardlink_inside_prefix() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_file("/usr/share/man/man1/foo.1", b"shared body")
            .add_hardlink("/usr/share/man/man1/baz.1", "/usr/share/man/man1/foo.1")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/foo.1", "/usr/share/man/man1/baz.1"]
            .into_iter()
            .collect();

        let report = run(&package, &dest, &mut wanted, &mut NoopReporter);

        assert_eq!(report.hardlinks_created, 1);
        assert_eq!(report.hardlinks_deferred, 0);
        assert_eq!(
            fs::read(temp.path().join("man1/baz.1")).unwrap(),
            b"shared body"
        );
    }

    #[test]
    fn test_hardlink_outside_prefix_skipped() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_file("/etc/shadow", b"root:x")
            .add_hardlink("/usr/share/man/man1/baz.1", "/etc/shadow")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/baz.1"].into_iter().collect();
        let mut reporter = CollectingReporter::new();

        let report = run(&package, &dest, &mut wanted, &mut reporter);

        assert_eq!(report.hardlinks_created, 0);
        assert_eq!(report.entries_skipped, 1);
        assert!(reporter.diagnostics[0].message.starts_with("skipping hardlink: "));
        assert!(!temp.path().join("man1/baz.1").exists());
    }

    #[test]
    fn test_hardlink_before_target_is_deferred() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_hardlink("/usr/share/man/man1/baz.1", "/usr/share/man/man1/foo.1")
            .add_file("/usr/share/man/man1/foo.1", b"late target")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/foo.1", "/usr/share/man/man1/baz.1"]
            .into_iter()
            .collect();

        let report = run(&package, &dest, &mut wanted, &mut NoopReporter);

        assert_eq!(report.hardlinks_deferred, 1);
        assert_eq!(report.hardlinks_created, 1);
        assert!(!report.has_diagnostics());
        assert_eq!(
            fs::read(temp.path().join("man1/baz.1")).unwrap(),
            b"late target"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_hardlink_ignores_stale_target_from_earlier_run() {
        use std::os::unix::fs::MetadataExt;

        let (temp, dest) = create_test_dest();
        fs::create_dir(temp.path().join("man1")).unwrap();
        fs::write(temp.path().join("man1/foo.1"), b"OLD").unwrap();
        let package = PackageBuilder::new()
            .add_hardlink("/usr/share/man/man1/baz.1", "/usr/share/man/man1/foo.1")
            .add_file("/usr/share/man/man1/foo.1", b"NEW")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/foo.1", "/usr/share/man/man1/baz.1"]
            .into_iter()
            .collect();

        let report = run(&package, &dest, &mut wanted, &mut NoopReporter);

        assert_eq!(report.hardlinks_deferred, 1);
        assert_eq!(report.hardlinks_created, 1);
        assert!(!report.has_diagnostics());
        let foo = fs::metadata(temp.path().join("man1/foo.1")).unwrap();
        let baz = fs::metadata(temp.path().join("man1/baz.1")).unwrap();
        assert_eq!(foo.ino(), baz.ino());
        assert_eq!(fs::read(temp.path().join("man1/baz.1")).unwrap(), b"NEW");
    }

    #[test]
    fn test_hardlink_to_unextracted_existing_output_reported() {
        let (temp, dest) = create_test_dest();
        fs::create_dir(temp.path().join("man1")).unwrap();
        fs::write(temp.path().join("man1/foo.1"), b"OLD").unwrap();
        let package = PackageBuilder::new()
            .add_hardlink("/usr/share/man/man1/baz.1", "/usr/share/man/man1/foo.1")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/baz.1"].into_iter().collect();
        let mut reporter = CollectingReporter::new();

        let report = run(&package, &dest, &mut wanted, &mut reporter);

        assert_eq!(report.hardlinks_created, 0);
        assert_eq!(report.entries_skipped, 1);
        assert!(reporter.diagnostics[0].message.contains("was not extracted"));
        assert!(!temp.path().join("man1/baz.1").exists());
    }

    #[test]
    fn test_hardlink_target_never_extracted() {
        let (_temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_hardlink("/usr/share/man/man1/baz.1", "/usr/share/man/man1/gone.1")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/baz.1"].into_iter().collect();

        let report = run(&package, &dest, &mut wanted, &mut NoopReporter);

        assert_eq!(report.hardlinks_created, 0);
        assert_eq!(report.entries_skipped, 1);
        assert!(!report.diagnostics[0].policy_violation);
    }

    #[test]
    fn test_unsupported_kinds_skipped() {
        let (_temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_directory("/usr/share/man/man9")
            .add_fifo("/usr/share/man/man1/pipe.1")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man9", "/usr/share/man/man1/pipe.1"]
            .into_iter()
            .collect();
        let mut reporter = CollectingReporter::new();

        let report = run(&package, &dest, &mut wanted, &mut reporter);

        assert_eq!(report.total_items(), 0);
        assert_eq!(report.entries_skipped, 2);
        assert!(
            reporter
                .diagnostics
                .iter()
                .all(|d| d.message.starts_with("skipping unsupported"))
        );
    }

    #[test]
    fn test_duplicate_entry_processed_once() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_file("/usr/share/man/man1/foo.1", b"first")
            .add_unlisted_file("/usr/share/man/man1/foo.1", b"second")
            .add_file("/usr/share/man/man1/zzz.1", b"z")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/foo.1", "/usr/share/man/man1/zzz.1"]
            .into_iter()
            .collect();

        let report = run(&package, &dest, &mut wanted, &mut NoopReporter);

        assert_eq!(report.files_extracted, 2);
        assert_eq!(fs::read(temp.path().join("man1/foo.1")).unwrap(), b"first");
    }

    #[test]
    fn test_stops_when_wanted_drained() {
        let (temp, dest) = create_test_dest();
        let package = PackageBuilder::new()
            .add_file("/usr/share/man/man1/foo.1", b"foo")
            .add_unlisted_file("/usr/share/man/man1/late.1", b"late")
            .build();
        let mut wanted: WantedSet = ["/usr/share/man/man1/foo.1"].into_iter().collect();
        let mut archive = tar::Archive::new(open_decompressed(package.as_slice()).unwrap());

        SelectiveExtractor::new(&dest, PREFIX)
            .extract(&mut archive, &mut wanted, &mut NoopReporter)
            .unwrap();

        assert!(!temp.path().join("man1/late.1").exists());
    }

    #[test]
    fn test_wanted_path_outside_prefix_is_policy_violation() {
        let (_temp, dest) = create_test_dest();
        let package = PackageBuilder::new().add_file("/usr/bin/foo", b"x").build();
        let mut wanted: WantedSet = ["/usr/bin/foo"].into_iter().collect();

        let report = run(&package, &dest, &mut wanted, &mut NoopReporter);
        assert_eq!(report.entries_skipped, 1);
        assert!(report.diagnostics[0].policy_violation);
    }

    #[test]
    fn test_extract_file_missing_archive() {
        let (_temp, dest) = create_test_dest();
        let mut wanted = WantedSet::new();
        let result = SelectiveExtractor::new(&dest, PREFIX).extract_file(
            Path::new("/nonexistent/foo-1.0_1.x86_64.xbps"),
            &mut wanted,
            &mut NoopReporter,
        );
        assert!(matches!(result, Err(DumpError::Io(_))));
    }
}
