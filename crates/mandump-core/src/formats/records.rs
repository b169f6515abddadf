//! Property list record decoding.
//!
//! XBPS stores every structured record (`index.plist`, `index-meta.plist`,
//! `files.plist`) as a property list inside a tar container. Records are
//! decoded with `serde` into typed structs; unknown keys are ignored.

use std::io::Read;

use serde::de::DeserializeOwned;

use crate::DumpError;
use crate::Result;

/// Decodes a property list record (XML or binary) from memory.
///
/// `entry` names the archive entry the bytes came from and is only used
/// for error messages.
///
/// # Errors
///
/// Returns `DumpError::Decode` if the bytes are not a property list of the
/// expected shape.
///
/// # Examples
///
/// ```
/// use mandump_core::formats::records::decode_record;
/// use std::collections::BTreeMap;
///
/// let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
/// <plist version="1.0"><dict><key>pkgver</key><string>man-pages-6.9_1</string></dict></plist>"#;
/// let record: BTreeMap<String, String> = decode_record("props.plist", xml)?;
/// assert_eq!(record["pkgver"], "man-pages-6.9_1");
/// # Ok::<(), mandump_core::DumpError>(())
/// ```
pub fn decode_record<T: DeserializeOwned>(entry: &str, bytes: &[u8]) -> Result<T> {
    plist::from_bytes(bytes).map_err(|source| DumpError::Decode {
        entry: entry.to_string(),
        source,
    })
}

/// Reads an archive entry to the end and decodes it as a record.
///
/// # Errors
///
/// Returns `DumpError::InvalidArchive` (or an I/O error) if the entry
/// cannot be read, or `DumpError::Decode` if decoding fails.
pub fn read_record<T: DeserializeOwned, R: Read>(entry: &str, reader: &mut R) -> Result<T> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).map_err(super::archive_error)?;
    decode_record(entry, &buf)
}
