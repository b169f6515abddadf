//! Symlink policy validation.

use std::path::Path;

use crate::Result;
use crate::types::DestDir;
use crate::types::SafePath;
use crate::types::SafeSymlink;

/// Validates that a symlink target is a sibling of the link.
///
/// This function delegates to `SafeSymlink::validate()`, which only
/// accepts targets consisting of a single file name.
///
/// # Errors
///
/// Returns `DumpError::SymlinkEscape` if the target has a directory
/// component, is absolute, or is `.`/`..`.
///
/// # Examples
///
/// ```
/// use mandump_core::security::validate_symlink;
/// use mandump_core::types::DestDir;
/// use mandump_core::types::SafePath;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let dest = DestDir::new(dir.path())?;
/// let link = SafePath::validate("man3/SSL_free.3")?;
///
/// let symlink = validate_symlink(&link, Path::new("SSL_new.3"), &dest)?;
/// assert_eq!(symlink.target_path(), Path::new("SSL_new.3"));
/// # Ok(())
/// # }
/// ```
pub fn validate_symlink(link_path: &SafePath, target: &Path, dest: &DestDir) -> Result<SafeSymlink> {
    SafeSymlink::validate(link_path, target, dest)
}
