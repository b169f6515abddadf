//! Package manifest (`./files.plist`) reader.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use super::archive_error;
use super::compression::open_decompressed;
use super::records::read_record;
use crate::DumpError;
use crate::Result;

/// Archive entry name of the package manifest.
pub const MANIFEST_ENTRY: &str = "./files.plist";

/// A directory owned by the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Absolute install path.
    #[serde(rename = "file")]
    pub name: String,
}

/// A regular file owned by the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute install path.
    #[serde(rename = "file")]
    pub name: String,

    /// Modification time, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<u64>,

    /// Hex SHA-256 of the file contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A symbolic link owned by the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Absolute install path of the link.
    #[serde(rename = "file")]
    pub name: String,

    /// Modification time, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<u64>,

    /// Link target exactly as stored.
    pub target: String,
}

/// Every path a package installs, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileManifest {
    /// Directories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dirs: Vec<DirEntry>,

    /// Regular files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileEntry>,

    /// Symbolic links.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkEntry>,
}

/// Selects the file and link paths under `prefix`.
///
/// Directories are never selected. Files come first, then links, each in
/// manifest order; the match is a plain string prefix test.
///
/// ```
/// use mandump_core::formats::manifest::{FileEntry, FileManifest, match_files};
///
/// let manifest = FileManifest {
///     files: vec![
///         FileEntry { name: "/usr/bin/mandoc".into(), mtime: None, sha256: None },
///         FileEntry { name: "/usr/share/man/man1/mandoc.1".into(), mtime: None, sha256: None },
///     ],
///     ..FileManifest::default()
/// };
/// assert_eq!(match_files(&manifest, "/usr/share/man/"), ["/usr/share/man/man1/mandoc.1"]);
/// ```
#[must_use]
pub fn match_files(manifest: &FileManifest, prefix: &str) -> Vec<String> {
    manifest
        .files
        .iter()
        .map(|f| &f.name)
        .chain(manifest.links.iter().map(|l| &l.name))
        .filter(|name| name.starts_with(prefix))
        .cloned()
        .collect()
}

/// Reads the manifest from a package stream.
///
/// Scanning stops at the first `./files.plist` entry.
///
/// # Errors
///
/// - `DumpError::UnsupportedCompression` or `DumpError::InvalidArchive` if
///   the stream is not a compressed tar container
/// - `DumpError::Decode` if the manifest is malformed
/// - `DumpError::MissingManifest` if no manifest entry exists
pub fn read_manifest_from<R: Read>(reader: R) -> Result<FileManifest> {
    let mut archive = tar::Archive::new(open_decompressed(reader)?);

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        if entry.path_bytes().as_ref() == MANIFEST_ENTRY.as_bytes() {
            return read_record(MANIFEST_ENTRY, &mut entry);
        }
    }

    Err(DumpError::MissingManifest)
}

/// Opens a package archive and reads its manifest.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened, otherwise the errors
/// of [`read_manifest_from`].
pub fn read_manifest(path: &Path) -> Result<FileManifest> {
    let file = File::open(path)?;
    read_manifest_from(file)
}
