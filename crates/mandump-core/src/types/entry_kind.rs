//! Archive and manifest entry kinds.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use crate::DumpError;
use crate::Result;

/// Kind of an entry found in a package archive or its manifest.
///
/// Extraction dispatches on this enum with an exhaustive `match`, so a new
/// kind cannot be added without deciding how it is materialized.
///
/// # Examples
///
/// ```
/// use mandump_core::types::EntryKind;
/// use std::path::PathBuf;
///
/// let link = EntryKind::Symlink {
///     target: PathBuf::from("foo.1"),
/// };
/// assert_eq!(link.to_string(), "symlink");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file.
    File,

    /// Directory.
    Directory,

    /// Symbolic link. The target has NOT been validated.
    Symlink {
        /// Link target as stored.
        target: PathBuf,
    },

    /// Hard link. The target is an archive entry name and has NOT been
    /// validated.
    Hardlink {
        /// Archive name of the linked entry.
        target: PathBuf,
    },

    /// Any other tar entry type (fifo, device node, ...).
    Other {
        /// Raw tar type flag.
        type_flag: u8,
    },
}

impl EntryKind {
    /// Classifies a tar entry, reading the link name for link entries.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::InvalidArchive` if a link entry carries no target.
    pub fn from_tar_entry<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Self> {
        let entry_type = entry.header().entry_type();
        let kind = match entry_type {
            tar::EntryType::Regular => Self::File,
            tar::EntryType::Directory => Self::Directory,
            tar::EntryType::Symlink => Self::Symlink {
                target: link_target(entry)?,
            },
            tar::EntryType::Link => Self::Hardlink {
                target: link_target(entry)?,
            },
            other => Self::Other {
                type_flag: other.as_byte(),
            },
        };
        Ok(kind)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("regular file"),
            Self::Directory => f.write_str("directory"),
            Self::Symlink { .. } => f.write_str("symlink"),
            Self::Hardlink { .. } => f.write_str("hardlink"),
            Self::Other { type_flag } => write!(f, "type {:?}", char::from(*type_flag)),
        }
    }
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>) -> Result<PathBuf> {
    let bytes = entry.link_name_bytes().ok_or_else(|| {
        DumpError::InvalidArchive(format!(
            "link entry without target: {}",
            String::from_utf8_lossy(&entry.path_bytes())
        ))
    })?;
    Ok(PathBuf::from(String::from_utf8_lossy(&bytes).into_owned()))
}
