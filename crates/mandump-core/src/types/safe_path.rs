//! Validated relative output path.

use crate::DumpError;
use crate::Result;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Strips the single leading `.` from an archive entry name.
///
/// XBPS archives store entries as `./usr/share/...`, while manifests list
/// them as `/usr/share/...`. Names without a leading `./` are returned
/// unchanged.
///
/// ```
/// use mandump_core::types::normalize_entry_name;
///
/// assert_eq!(normalize_entry_name("./usr/share/man/man1/ls.1"), "/usr/share/man/man1/ls.1");
/// assert_eq!(normalize_entry_name("usr/bin/ls"), "usr/bin/ls");
/// ```
#[must_use]
pub fn normalize_entry_name(name: &str) -> &str {
    if name.starts_with("./") {
        &name[1..]
    } else {
        name
    }
}

/// A relative path that is safe to join under the output directory.
///
/// `SafePath` never contains `..`, root, or prefix components, and always
/// has at least one normal component.
///
/// # Security Properties
///
/// - Can ONLY be constructed through validation
/// - NO `From<PathBuf>` implementation
/// - `.` components are dropped during normalization
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(PathBuf);

impl SafePath {
    /// Validates a relative path.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::PathTraversal` if the path is empty, contains a
    /// null byte, is absolute, or contains `..`.
    pub fn validate(relative: &str) -> Result<Self> {
        if relative.contains('\0') {
            return Err(DumpError::PathTraversal {
                path: relative.replace('\0', "\\0"),
            });
        }

        let mut normalized = PathBuf::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(DumpError::PathTraversal {
                        path: relative.to_string(),
                    });
                }
            }
        }

        if normalized.as_os_str().is_empty() {
            return Err(DumpError::PathTraversal {
                path: relative.to_string(),
            });
        }

        Ok(Self(normalized))
    }

    /// Validates an archive entry name relative to `prefix`.
    ///
    /// The name is normalized with [`normalize_entry_name`], `prefix` is
    /// stripped, and the remainder is validated.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::PathTraversal` if the normalized name is not
    /// under `prefix` or the remainder fails [`SafePath::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use mandump_core::types::SafePath;
    /// use std::path::Path;
    ///
    /// let safe = SafePath::from_archive_name("./usr/share/man/man1/ls.1", "/usr/share/man/")?;
    /// assert_eq!(safe.as_path(), Path::new("man1/ls.1"));
    ///
    /// assert!(SafePath::from_archive_name("./usr/bin/ls", "/usr/share/man/").is_err());
    /// # Ok::<(), mandump_core::DumpError>(())
    /// ```
    pub fn from_archive_name(name: &str, prefix: &str) -> Result<Self> {
        let normalized = normalize_entry_name(name);
        let relative =
            normalized
                .strip_prefix(prefix)
                .ok_or_else(|| DumpError::PathTraversal {
                    path: name.to_string(),
                })?;
        Self::validate(relative)
    }

    /// Returns the relative path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}
