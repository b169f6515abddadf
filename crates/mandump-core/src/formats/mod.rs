//! XBPS container formats.
//!
//! Repodata files and package archives are both compressed tar streams
//! carrying property list records. This module detects the compression,
//! walks the tar entries, and decodes the records.

pub mod compression;
pub mod manifest;
pub mod records;
pub mod repodata;

pub use compression::CompressionCodec;
pub use manifest::FileManifest;
pub use manifest::match_files;
pub use manifest::read_manifest;
pub use repodata::PackageDescriptor;
pub use repodata::Repodata;
pub use repodata::RepositoryIndex;
pub use repodata::read_repodata_file;

use std::io;

use crate::DumpError;

/// Classifies an I/O error raised while walking a container.
///
/// Decoder and tar parsing failures surface as `InvalidData`,
/// `InvalidInput`, `UnexpectedEof` or `Other`; those mean the container
/// is malformed. Anything else is a genuine I/O failure.
pub(crate) fn archive_error(err: io::Error) -> DumpError {
    match err.kind() {
        io::ErrorKind::InvalidData
        | io::ErrorKind::InvalidInput
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::Other => DumpError::InvalidArchive(err.to_string()),
        _ => DumpError::Io(err),
    }
}
