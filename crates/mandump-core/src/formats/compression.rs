//! Compression codec detection for repodata and package archives.
//!
//! XBPS has shipped repodata as gzip and packages as xz; current
//! repositories use zstd for both. The codec is detected from the stream's
//! magic number instead of the file name.
//!
//! # Supported Codecs
//!
//! - **Gzip**: `1f 8b`
//! - **Xz**: `fd 37 7a 58 5a 00`
//! - **Zstd**: `28 b5 2f fd`

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;

use crate::DumpError;
use crate::Result;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Compression codec of a repodata file or package archive.
///
/// # Examples
///
/// ```
/// use mandump_core::formats::compression::CompressionCodec;
///
/// assert_eq!(CompressionCodec::detect(&[0x1f, 0x8b, 0x08]), Some(CompressionCodec::Gzip));
/// assert_eq!(CompressionCodec::detect(b"ustar"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionCodec {
    /// Gzip (deflate) compression.
    Gzip,

    /// Xz (LZMA2) compression.
    Xz,

    /// Zstandard compression.
    Zstd,
}

impl CompressionCodec {
    /// Identifies a codec from the leading bytes of a stream.
    #[must_use]
    pub fn detect(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(GZIP_MAGIC) {
            Some(Self::Gzip)
        } else if magic.starts_with(XZ_MAGIC) {
            Some(Self::Xz)
        } else if magic.starts_with(ZSTD_MAGIC) {
            Some(Self::Zstd)
        } else {
            None
        }
    }

    /// Returns a human-readable name for this codec.
    ///
    /// ```
    /// use mandump_core::formats::compression::CompressionCodec;
    ///
    /// assert_eq!(CompressionCodec::Xz.name(), "xz");
    /// ```
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Wraps a buffered reader in the matching streaming decoder.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the zstd decoder cannot be initialized.
    pub fn decoder<'a, R: BufRead + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>> {
        let decoder: Box<dyn Read + 'a> = match self {
            Self::Gzip => Box::new(flate2::bufread::GzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::bufread::XzDecoder::new(reader)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::with_buffer(reader)?),
        };
        Ok(decoder)
    }
}

/// Detects the codec of `reader` and returns a decompressing reader.
///
/// Nothing is consumed from `reader` beyond what the decoder reads itself;
/// the magic number is inspected through the read buffer.
///
/// # Errors
///
/// Returns `DumpError::InvalidArchive` for an empty stream and
/// `DumpError::UnsupportedCompression` for an unknown magic number.
pub fn open_decompressed<'a, R: Read + 'a>(reader: R) -> Result<Box<dyn Read + 'a>> {
    let mut reader = BufReader::new(reader);
    let magic = reader.fill_buf()?;
    if magic.is_empty() {
        return Err(DumpError::InvalidArchive("empty input".into()));
    }

    let codec = CompressionCodec::detect(magic).ok_or(DumpError::UnsupportedCompression)?;
    tracing::trace!(codec = codec.name(), "detected compression");
    codec.decoder(reader)
}
