//! Output directory type.

use crate::Result;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use super::SafePath;

/// The directory extracted pages are written into.
///
/// The path is kept exactly as configured (not canonicalized), so
/// reported output paths read the way the user typed them.
///
/// # Examples
///
/// ```no_run
/// use mandump_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/srv/man")?;
/// println!("extracting into {}", dest.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Wraps an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the path does not exist or is not a
    /// directory.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("output directory {}: {e}", path.display()),
            )
        })?;

        if !metadata.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            )
            .into());
        }

        Ok(Self(path))
    }

    /// Creates the directory (and its parents) if needed, then wraps it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created or a
    /// non-directory already occupies the path.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Self::new(path)
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins a validated relative path to this directory.
    #[inline]
    #[must_use]
    pub fn join(&self, safe_path: &SafePath) -> PathBuf {
        self.0.join(safe_path.as_path())
    }
}
