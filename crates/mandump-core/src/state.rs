//! Incremental extraction state.
//!
//! The state file records, per package content hash, which paths were
//! extracted from it. A hash present in the state was fully processed by an
//! earlier run, so its package is not opened again. Each run rebuilds the
//! mapping from scratch and replaces the file as a whole; hashes no longer
//! listed in any index fall out.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::DumpError;
use crate::Result;

/// Mapping from package content hash to the paths extracted from it.
///
/// An empty path list means "processed, nothing matched"; older state files
/// spell that as `null`, which loads as an empty list. Keys are kept sorted,
/// so saving the same mapping twice produces identical bytes.
///
/// # Examples
///
/// ```
/// use mandump_core::ExtractionState;
///
/// let mut state = ExtractionState::new();
/// state.insert("c0ffee", vec!["/usr/share/man/man1/foo.1".to_string()]);
/// assert!(state.contains("c0ffee"));
/// assert_eq!(state.get("c0ffee").map(<[String]>::len), Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractionState(BTreeMap<String, Vec<String>>);

impl ExtractionState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the state file at `path`.
    ///
    /// A missing file yields an empty state.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::StateCorrupt` if the file exists but cannot be
    /// read or is not a JSON object of string arrays.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file, starting fresh");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(DumpError::StateCorrupt {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        let raw: BTreeMap<String, Option<Vec<String>>> =
            serde_json::from_slice(&bytes).map_err(|e| DumpError::StateCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let state = Self(
            raw.into_iter()
                .map(|(hash, paths)| (hash, paths.unwrap_or_default()))
                .collect(),
        );
        debug!(path = %path.display(), packages = state.len(), "loaded state");
        Ok(state)
    }

    /// Writes the state to `path`, replacing any existing file atomically.
    ///
    /// The document is tab-indented JSON. It is written to a temporary file
    /// in the same directory and renamed over `path`, so readers never
    /// observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::StateWrite` if the temporary file cannot be
    /// created, written, or persisted.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.write_atomic(path).map_err(|source| DumpError::StateWrite {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), packages = self.len(), "saved state");
        Ok(())
    }

    fn write_atomic(&self, path: &Path) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let mut ser =
                serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"\t"));
            self.serialize(&mut ser).map_err(io::Error::from)?;
            writer.flush()?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))?;
        }

        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Returns the recorded paths for `hash`.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&[String]> {
        self.0.get(hash).map(Vec::as_slice)
    }

    /// Records the paths extracted for `hash`, replacing any previous entry.
    pub fn insert(&mut self, hash: impl Into<String>, paths: Vec<String>) {
        self.0.insert(hash.into(), paths);
    }

    /// Returns whether `hash` has been processed.
    #[must_use]
    pub fn contains(&self, hash: &str) -> bool {
        self.0.contains_key(hash)
    }

    /// Number of packages recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(hash, paths)` pairs in hash order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
