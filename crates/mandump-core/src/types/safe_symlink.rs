//! Validated symlink type.

use crate::DumpError;
use crate::Result;
use std::path::Path;
use std::path::PathBuf;
use std::path::is_separator;

use super::DestDir;
use super::SafePath;

/// A symlink whose target is a sibling of the link.
///
/// Targets must be a plain file name: no path separator anywhere (a
/// trailing `/` included), and neither `.` nor `..`. Since the link itself
/// lives under the output directory, the target then always resolves into
/// the same directory as the link.
///
/// # Examples
///
/// ```
/// use mandump_core::types::DestDir;
/// use mandump_core::types::SafePath;
/// use mandump_core::types::SafeSymlink;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let dest = DestDir::new(dir.path())?;
/// let link = SafePath::validate("man1/bar.1")?;
///
/// assert!(SafeSymlink::validate(&link, Path::new("foo.1"), &dest).is_ok());
/// assert!(SafeSymlink::validate(&link, Path::new("../man8/foo.8"), &dest).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeSymlink {
    link_path: PathBuf,
    target_path: PathBuf,
}

impl SafeSymlink {
    /// Validates and constructs a `SafeSymlink`.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::SymlinkEscape` if the target has a directory
    /// component or is not a plain file name.
    pub fn validate(link: &SafePath, target: &Path, dest: &DestDir) -> Result<Self> {
        // Checked on the raw name: `components()` folds away `foo.1/` and `foo.1/.`.
        let name = target.to_string_lossy();
        let is_sibling =
            !name.is_empty() && name != "." && name != ".." && !name.contains(is_separator);

        if !is_sibling {
            return Err(DumpError::SymlinkEscape {
                path: dest.join(link),
                target: target.to_path_buf(),
            });
        }

        Ok(Self {
            link_path: link.as_path().to_path_buf(),
            target_path: target.to_path_buf(),
        })
    }

    /// Returns the link path relative to the output directory.
    #[inline]
    #[must_use]
    pub fn link_path(&self) -> &Path {
        &self.link_path
    }

    /// Returns the target exactly as it will be stored in the link.
    #[inline]
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }
}
