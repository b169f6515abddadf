//! Builders for XBPS fixtures used by unit, integration, and CLI tests.
//!
//! Packages and repodata files are produced exactly the way `xbps-create`
//! and `xbps-rindex` lay them out: compressed tar streams whose entry names
//! start with `./` and whose property list records are XML.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::formats::compression::CompressionCodec;
use crate::formats::manifest::DirEntry;
use crate::formats::manifest::FileEntry;
use crate::formats::manifest::FileManifest;
use crate::formats::manifest::LinkEntry;
use crate::formats::manifest::MANIFEST_ENTRY;
use crate::formats::repodata::DUMMY_INDEX_META;
use crate::formats::repodata::INDEX_ENTRY;
use crate::formats::repodata::INDEX_META_ENTRY;
use crate::formats::repodata::PackageDescriptor;
use crate::formats::repodata::RepositoryIndex;
use crate::formats::repodata::SigningMetadata;

/// Builds a v7 tar header with the name and link name stored verbatim.
///
/// `tar::Header::set_path` strips a leading `./`, which real XBPS archives
/// keep, so the name bytes are written directly. Both names must be shorter
/// than 100 bytes.
#[must_use]
pub fn raw_tar_header(
    name: &str,
    entry_type: tar::EntryType,
    size: u64,
    link: Option<&str>,
) -> tar::Header {
    assert!(name.len() < 100, "entry name too long for a v7 header: {name}");

    let mut header = tar::Header::new_old();
    {
        let old = header.as_old_mut();
        old.name[..name.len()].copy_from_slice(name.as_bytes());
        if let Some(link) = link {
            assert!(link.len() < 100, "link name too long for a v7 header: {link}");
            old.linkname[..link.len()].copy_from_slice(link.as_bytes());
        }
    }

    let mode = match entry_type {
        tar::EntryType::Directory => 0o755,
        tar::EntryType::Symlink => 0o777,
        _ => 0o644,
    };
    header.set_size(size);
    header.set_mode(mode);
    header.set_mtime(1_700_000_000);
    header.set_entry_type(entry_type);
    header.set_cksum();
    header
}

/// Compresses `data` with `codec`.
#[must_use]
pub fn compress(codec: CompressionCodec, data: &[u8]) -> Vec<u8> {
    match codec {
        CompressionCodec::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        CompressionCodec::Xz => {
            let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        CompressionCodec::Zstd => zstd::encode_all(data, 0).unwrap(),
    }
}

/// Serializes a record as an XML property list.
#[must_use]
pub fn plist_xml<T: serde::Serialize>(record: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    plist::to_writer_xml(&mut buf, record).unwrap();
    buf
}

/// Shorthand for a descriptor with only the identifying fields.
#[must_use]
pub fn descriptor(pkgver: &str, architecture: &str, sha256: &str) -> PackageDescriptor {
    PackageDescriptor::new(pkgver, architecture, sha256)
}

/// Archive entry name for an install path (`/usr/x` becomes `./usr/x`).
fn archive_name(path: &str) -> String {
    if path.starts_with('/') {
        format!(".{path}")
    } else {
        path.to_string()
    }
}

struct FixtureEntry {
    name: String,
    entry_type: tar::EntryType,
    data: Vec<u8>,
    link: Option<String>,
}

fn append_entry(builder: &mut tar::Builder<Vec<u8>>, entry: &FixtureEntry) {
    let header = raw_tar_header(
        &entry.name,
        entry.entry_type,
        entry.data.len() as u64,
        entry.link.as_deref(),
    );
    builder.append(&header, entry.data.as_slice()).unwrap();
}

/// Builder for `.xbps` package archives.
///
/// Paths are given as install paths (`/usr/share/man/...`). The manifest
/// is generated from the added entries and stored first, as `./files.plist`.
///
/// # Examples
///
/// ```
/// use mandump_core::test_utils::PackageBuilder;
///
/// let package = PackageBuilder::new()
///     .add_file("/usr/share/man/man1/foo.1", b".TH FOO 1")
///     .add_symlink("/usr/share/man/man1/bar.1", "foo.1")
///     .build();
/// assert!(!package.is_empty());
/// ```
pub struct PackageBuilder {
    manifest: FileManifest,
    entries: Vec<FixtureEntry>,
    include_manifest: bool,
    codec: CompressionCodec,
}

impl PackageBuilder {
    /// Creates an xz-compressed package builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            manifest: FileManifest::default(),
            entries: Vec::new(),
            include_manifest: true,
            codec: CompressionCodec::Xz,
        }
    }

    /// Adds a directory, listed in the manifest.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        self.manifest.dirs.push(DirEntry { name: path.into() });
        self.push(path, tar::EntryType::Directory, Vec::new(), None);
        self
    }

    /// Adds a regular file, listed in the manifest.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        self.list_file(path);
        self.push(path, tar::EntryType::Regular, data.to_vec(), None);
        self
    }

    /// Adds a regular file that the manifest does not mention.
    #[must_use]
    pub fn add_unlisted_file(mut self, path: &str, data: &[u8]) -> Self {
        self.push(path, tar::EntryType::Regular, data.to_vec(), None);
        self
    }

    /// Adds a symlink, listed in the manifest; `target` is stored verbatim.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        self.manifest.links.push(LinkEntry {
            name: path.into(),
            mtime: Some(1_700_000_000),
            target: target.into(),
        });
        self.push(path, tar::EntryType::Symlink, Vec::new(), Some(target.to_string()));
        self
    }

    /// Adds a hardlink to another install path, listed as a file.
    #[must_use]
    pub fn add_hardlink(mut self, path: &str, target: &str) -> Self {
        self.list_file(path);
        self.push(path, tar::EntryType::Link, Vec::new(), Some(archive_name(target)));
        self
    }

    /// Adds a fifo, listed as a file.
    #[must_use]
    pub fn add_fifo(mut self, path: &str) -> Self {
        self.list_file(path);
        self.push(path, tar::EntryType::Fifo, Vec::new(), None);
        self
    }

    /// Leaves out `./files.plist`.
    #[must_use]
    pub fn omit_manifest(mut self) -> Self {
        self.include_manifest = false;
        self
    }

    /// Selects the compression codec.
    #[must_use]
    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Builds and returns the compressed package bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        if self.include_manifest {
            let xml = plist_xml(&self.manifest);
            let header =
                raw_tar_header(MANIFEST_ENTRY, tar::EntryType::Regular, xml.len() as u64, None);
            builder.append(&header, xml.as_slice()).unwrap();
        }
        for entry in &self.entries {
            append_entry(&mut builder, entry);
        }

        compress(self.codec, &builder.into_inner().unwrap())
    }

    /// Writes the package into `dir` under the name the index expects.
    pub fn write_to(self, dir: &Path, package: &PackageDescriptor) -> PathBuf {
        let path = dir.join(package.archive_file_name());
        fs::write(&path, self.build()).unwrap();
        path
    }

    fn list_file(&mut self, path: &str) {
        self.manifest.files.push(FileEntry {
            name: path.into(),
            mtime: Some(1_700_000_000),
            sha256: None,
        });
    }

    fn push(&mut self, path: &str, entry_type: tar::EntryType, data: Vec<u8>, link: Option<String>) {
        self.entries.push(FixtureEntry {
            name: archive_name(path),
            entry_type,
            data,
            link,
        });
    }
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `<arch>-repodata` files.
///
/// # Examples
///
/// ```
/// use mandump_core::formats::repodata::read_repodata;
/// use mandump_core::test_utils::RepodataBuilder;
/// use mandump_core::test_utils::descriptor;
///
/// let bytes = RepodataBuilder::new()
///     .with_dummy_meta()
///     .add_package("foo", descriptor("foo-1.0_1", "x86_64", "c0ffee"))
///     .build();
/// let repodata = read_repodata(bytes.as_slice()).unwrap();
/// assert_eq!(repodata.index["foo"].pkgver, "foo-1.0_1");
/// ```
pub struct RepodataBuilder {
    index: RepositoryIndex,
    meta: Option<Vec<u8>>,
    include_index: bool,
    meta_after_index: bool,
    codec: CompressionCodec,
}

impl RepodataBuilder {
    /// Creates a gzip-compressed repodata builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: RepositoryIndex::new(),
            meta: None,
            include_index: true,
            meta_after_index: false,
            codec: CompressionCodec::Gzip,
        }
    }

    /// Adds a package under `name`.
    #[must_use]
    pub fn add_package(mut self, name: &str, package: PackageDescriptor) -> Self {
        self.index.insert(name.to_string(), package);
        self
    }

    /// Adds a signed `index-meta.plist`.
    #[must_use]
    pub fn with_signing(mut self, meta: SigningMetadata) -> Self {
        self.meta = Some(plist_xml(&meta));
        self
    }

    /// Adds the `DEADBEEF` placeholder `index-meta.plist`.
    #[must_use]
    pub fn with_dummy_meta(mut self) -> Self {
        self.meta = Some(DUMMY_INDEX_META.to_vec());
        self
    }

    /// Adds an `index-meta.plist` with arbitrary contents.
    #[must_use]
    pub fn with_raw_meta(mut self, payload: Vec<u8>) -> Self {
        self.meta = Some(payload);
        self
    }

    /// Leaves out `index.plist`.
    #[must_use]
    pub fn without_index(mut self) -> Self {
        self.include_index = false;
        self
    }

    /// Stores `index-meta.plist` after `index.plist`.
    #[must_use]
    pub fn meta_after_index(mut self) -> Self {
        self.meta_after_index = true;
        self
    }

    /// Selects the compression codec.
    #[must_use]
    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Builds and returns the compressed repodata bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let index = self.include_index.then(|| FixtureEntry {
            name: INDEX_ENTRY.to_string(),
            entry_type: tar::EntryType::Regular,
            data: plist_xml(&self.index),
            link: None,
        });
        let meta = self.meta.map(|data| FixtureEntry {
            name: INDEX_META_ENTRY.to_string(),
            entry_type: tar::EntryType::Regular,
            data,
            link: None,
        });

        let ordered = if self.meta_after_index {
            [index, meta]
        } else {
            [meta, index]
        };
        for entry in ordered.iter().flatten() {
            append_entry(&mut builder, entry);
        }

        compress(self.codec, &builder.into_inner().unwrap())
    }

    /// Writes the repodata file as `dir/file_name`.
    pub fn write_to(self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        fs::write(&path, self.build()).unwrap();
        path
    }
}

impl Default for RepodataBuilder {
    fn default() -> Self {
        Self::new()
    }
}
