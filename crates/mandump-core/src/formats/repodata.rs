//! Repository index (`<arch>-repodata`) reader.
//!
//! A repodata file is a compressed tar stream holding `index.plist` (a
//! dictionary of package name to package descriptor) and, optionally,
//! `index-meta.plist` with the repository signing key. Local repositories
//! that were never signed carry the literal bytes `DEADBEEF` as their
//! `index-meta.plist`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::trace;

use super::archive_error;
use super::compression::open_decompressed;
use super::records::read_record;
use crate::DumpError;
use crate::Result;

/// Name of the mandatory package dictionary entry.
pub const INDEX_ENTRY: &str = "index.plist";

/// Name of the optional signing metadata entry.
pub const INDEX_META_ENTRY: &str = "index-meta.plist";

/// Placeholder payload written by unsigned local repositories.
pub const DUMMY_INDEX_META: &[u8] = b"DEADBEEF";

/// One package version/architecture pair listed in a repository index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Package name and version, e.g. `man-pages-6.9.1_1`.
    pub pkgver: String,

    /// Target architecture, e.g. `x86_64` or `noarch`.
    pub architecture: String,

    /// Hex SHA-256 digest of the package archive; stable identity.
    #[serde(rename = "filename-sha256")]
    pub sha256: String,

    /// Declared size of the package archive in bytes.
    #[serde(rename = "filename-size", default)]
    pub size: u64,

    /// One-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_desc: Option<String>,

    /// License expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Upstream homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    /// Package maintainer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,

    /// Size of the installed files in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_size: Option<u64>,

    /// Build timestamp as recorded by xbps-create.
    #[serde(rename = "build-date", default, skip_serializing_if = "Option::is_none")]
    pub build_date: Option<String>,

    /// Runtime dependency patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run_depends: Vec<String>,
}

impl PackageDescriptor {
    /// Creates a descriptor with only the identifying fields set.
    #[must_use]
    pub fn new(
        pkgver: impl Into<String>,
        architecture: impl Into<String>,
        sha256: impl Into<String>,
    ) -> Self {
        Self {
            pkgver: pkgver.into(),
            architecture: architecture.into(),
            sha256: sha256.into(),
            size: 0,
            short_desc: None,
            license: None,
            homepage: None,
            maintainer: None,
            installed_size: None,
            build_date: None,
            run_depends: Vec::new(),
        }
    }

    /// File name of the package archive, relative to the repository
    /// directory.
    ///
    /// ```
    /// use mandump_core::formats::repodata::PackageDescriptor;
    ///
    /// let pkg = PackageDescriptor::new("mdocml-1.14.6_3", "x86_64", "ab12");
    /// assert_eq!(pkg.archive_file_name(), "mdocml-1.14.6_3.x86_64.xbps");
    /// ```
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}.{}.xbps", self.pkgver, self.architecture)
    }

    /// `pkgver.architecture`, used in progress output.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}.{}", self.pkgver, self.architecture)
    }
}

/// Repository signing metadata. Decoded for completeness; never verified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningMetadata {
    /// PEM encoded RSA public key.
    #[serde(rename = "public-key", default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<plist::Data>,

    /// Key size in bits.
    #[serde(rename = "public-key-size", default, skip_serializing_if = "Option::is_none")]
    pub public_key_size: Option<u64>,

    /// Signer identity.
    #[serde(rename = "signature-by", default, skip_serializing_if = "Option::is_none")]
    pub signature_by: Option<String>,

    /// Signature algorithm, e.g. `rsa`.
    #[serde(rename = "signature-type", default, skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<String>,
}

/// Mapping from package name to descriptor.
pub type RepositoryIndex = BTreeMap<String, PackageDescriptor>;

/// Decoded contents of a repodata file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repodata {
    /// Signing metadata, `None` when absent or a `DEADBEEF` placeholder.
    pub signing: Option<SigningMetadata>,

    /// Every package in the repository.
    pub index: RepositoryIndex,
}

/// Reads a repodata stream.
///
/// Both known entries are decoded when present; scanning does not stop
/// after the index is found.
///
/// # Errors
///
/// - `DumpError::UnsupportedCompression` or `DumpError::InvalidArchive` if
///   the stream is not a compressed tar container
/// - `DumpError::Decode` if either record is malformed
/// - `DumpError::MissingIndex` if there is no `index.plist` entry
pub fn read_repodata<R: Read>(reader: R) -> Result<Repodata> {
    let mut archive = tar::Archive::new(open_decompressed(reader)?);
    let mut signing = None;
    let mut index = None;

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let name = entry.path_bytes().into_owned();

        match name.as_slice() {
            b"index-meta.plist" => {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf).map_err(archive_error)?;
                signing = parse_signing_metadata(&buf)?;
            }
            b"index.plist" => {
                let parsed: RepositoryIndex = read_record(INDEX_ENTRY, &mut entry)?;
                debug!(packages = parsed.len(), "decoded repository index");
                index = Some(parsed);
            }
            other => trace!(entry = %String::from_utf8_lossy(other), "ignoring repodata entry"),
        }
    }

    let index = index.ok_or(DumpError::MissingIndex)?;
    Ok(Repodata { signing, index })
}

/// Opens and reads a repodata file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened, otherwise the errors
/// of [`read_repodata`].
pub fn read_repodata_file(path: &Path) -> Result<Repodata> {
    let file = File::open(path)?;
    read_repodata(file)
}

/// Decodes an `index-meta.plist` payload.
///
/// # Errors
///
/// Returns `DumpError::Decode` if the payload is neither the placeholder
/// nor a valid record.
///
/// ```
/// use mandump_core::formats::repodata::parse_signing_metadata;
///
/// assert_eq!(parse_signing_metadata(b"DEADBEEF")?, None);
/// # Ok::<(), mandump_core::DumpError>(())
/// ```
pub fn parse_signing_metadata(payload: &[u8]) -> Result<Option<SigningMetadata>> {
    if payload == DUMMY_INDEX_META {
        return Ok(None);
    }
    super::records::decode_record(INDEX_META_ENTRY, payload).map(Some)
}
