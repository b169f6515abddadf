//! Hardlink validation and tracking.

use std::collections::HashSet;
use std::path::Path;

use crate::DumpError;
use crate::Result;
use crate::types::DestDir;
use crate::types::SafePath;

/// A hardlink whose target had not been extracted when it was encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHardlink {
    /// Output-relative path of the link.
    pub link: SafePath,
    /// Output-relative path of the file it links to.
    pub target: SafePath,
}

/// Tracks hardlink targets during the extraction of one package.
///
/// Hardlink targets in XBPS archives are archive entry names
/// (`./usr/share/man/...`). A target is only accepted when, after
/// normalization, it lies under the extraction prefix; it is then mapped to
/// its output location exactly like an extracted file.
///
/// # Deferred Resolution
///
/// A hardlink may only point at an output written earlier in the same
/// pass; a file left in the output directory by a previous run does not
/// count. Links whose target has not been written yet are recorded with
/// [`HardlinkTracker::defer`] and retried once the scan is complete.
///
/// # Examples
///
/// ```
/// use mandump_core::security::HardlinkTracker;
/// use mandump_core::types::DestDir;
/// use mandump_core::types::SafePath;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let dest = DestDir::new(dir.path())?;
/// let mut tracker = HardlinkTracker::new();
/// let link = SafePath::validate("man1/baz.1")?;
///
/// let target = tracker.validate_hardlink(
///     &link,
///     Path::new("./usr/share/man/man1/foo.1"),
///     "/usr/share/man/",
///     &dest,
/// )?;
/// assert_eq!(target.as_path(), Path::new("man1/foo.1"));
/// assert!(!tracker.is_extracted(&target));
///
/// tracker.record_extracted(&target);
/// assert!(tracker.is_extracted(&target));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    /// Outputs written during this pass
    extracted: HashSet<SafePath>,
    deferred: Vec<PendingHardlink>,
}

impl HardlinkTracker {
    /// Creates a new hardlink tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a hardlink target and returns its output-relative path.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::HardlinkEscape` if the normalized target is not
    /// under `prefix`, escapes via `..`, or names the link itself.
    pub fn validate_hardlink(
        &self,
        link: &SafePath,
        target: &Path,
        prefix: &str,
        dest: &DestDir,
    ) -> Result<SafePath> {
        let escape = || DumpError::HardlinkEscape {
            path: dest.join(link),
            target: target.to_path_buf(),
        };

        let target_name = target.to_string_lossy();
        let resolved = SafePath::from_archive_name(&target_name, prefix).map_err(|_| escape())?;

        if resolved == *link {
            return Err(escape());
        }
        Ok(resolved)
    }

    /// Marks an output as written during this pass.
    pub fn record_extracted(&mut self, path: &SafePath) {
        self.extracted.insert(path.clone());
    }

    /// Checks whether `path` was written during this pass.
    #[must_use]
    pub fn is_extracted(&self, path: &SafePath) -> bool {
        self.extracted.contains(path)
    }

    /// Records a hardlink to retry after the archive scan.
    pub fn defer(&mut self, link: SafePath, target: SafePath) {
        self.deferred.push(PendingHardlink { link, target });
    }

    /// Removes and returns all deferred hardlinks in the order recorded.
    pub fn take_deferred(&mut self) -> Vec<PendingHardlink> {
        std::mem::take(&mut self.deferred)
    }
}
