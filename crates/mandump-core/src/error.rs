//! Error types for repository, package, and state operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `DumpError`.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Errors that can occur while harvesting man pages.
#[derive(Error, Debug)]
pub enum DumpError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container is corrupted or not a tar stream.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Compressed stream starts with an unknown magic number.
    #[error("unrecognized compression format")]
    UnsupportedCompression,

    /// Repodata container has no `index.plist` entry.
    #[error("missing index.plist in repodata")]
    MissingIndex,

    /// Package archive has no `./files.plist` entry.
    #[error("no files.plist in package")]
    MissingManifest,

    /// A property list record could not be decoded.
    #[error("decode {entry}: {source}")]
    Decode {
        /// Name of the archive entry holding the record.
        entry: String,
        /// Underlying decoder error.
        #[source]
        source: plist::Error,
    },

    /// A repository index given on the command line could not be read.
    #[error("parse {}: {source}", path.display())]
    IndexUnreadable {
        /// Path of the repodata file.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: Box<DumpError>,
    },

    /// The persisted extraction state exists but cannot be used.
    #[error("state file {} is unreadable: {reason}", path.display())]
    StateCorrupt {
        /// Path of the state file.
        path: PathBuf,
        /// Why it could not be loaded.
        reason: String,
    },

    /// The new extraction state could not be written.
    #[error("write state {}: {source}", path.display())]
    StateWrite {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Entry path would resolve outside the output directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry name.
        path: String,
    },

    /// Symlink target is not a sibling of the link.
    #[error("skipping symlink: {} -> {}", path.display(), target.display())]
    SymlinkEscape {
        /// The symlink path.
        path: PathBuf,
        /// The rejected target.
        target: PathBuf,
    },

    /// Hardlink target lies outside the managed prefix.
    #[error("skipping hardlink: {} -> {}", path.display(), target.display())]
    HardlinkEscape {
        /// The hardlink path.
        path: PathBuf,
        /// The rejected target.
        target: PathBuf,
    },

    /// Entry kind cannot be materialized.
    #[error("skipping unsupported {kind} at {path}")]
    UnsupportedEntry {
        /// The entry name as stored in the archive.
        path: String,
        /// Human-readable entry kind.
        kind: String,
    },
}

impl DumpError {
    /// Returns `true` if this error is a link or path policy violation.
    ///
    /// Policy violations are always reported and never abort extraction.
    ///
    /// # Examples
    ///
    /// ```
    /// use mandump_core::DumpError;
    /// use std::path::PathBuf;
    ///
    /// let err = DumpError::SymlinkEscape {
    ///     path: PathBuf::from("man1/bar.1"),
    ///     target: PathBuf::from("../foo.1"),
    /// };
    /// assert!(err.is_policy_violation());
    /// assert!(!DumpError::MissingIndex.is_policy_violation());
    /// ```
    #[must_use]
    pub const fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. } | Self::SymlinkEscape { .. } | Self::HardlinkEscape { .. }
        )
    }

    /// Returns `true` if this error must terminate the whole run.
    ///
    /// Only state file and repository index failures are fatal; everything
    /// else is scoped to a single package or entry.
    #[must_use]
    pub const fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            Self::StateCorrupt { .. } | Self::StateWrite { .. } | Self::IndexUnreadable { .. }
        )
    }
}
