//! Error conversion utilities for CLI.
//!
//! Converts mandump-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use mandump_core::DumpError;
use std::path::Path;

/// Converts a fatal `DumpError` into an anyhow error with a hint.
pub fn convert_dump_error(err: DumpError, output_dir: &Path) -> anyhow::Error {
    match err {
        DumpError::StateCorrupt { path, reason } => {
            anyhow!(
                "read state {}: {reason}\n\
                 HINT: Delete the state file to re-extract every package.",
                path.display()
            )
        }
        DumpError::StateWrite { path, source } => {
            anyhow!(
                "write state {}: {source}\n\
                 HINT: Check that the output directory is writable.",
                path.display()
            )
        }
        DumpError::IndexUnreadable { path, source } => match *source {
            DumpError::Io(io_err) => anyhow!("{}: {io_err}", path.display()),
            inner @ (DumpError::UnsupportedCompression | DumpError::InvalidArchive(_)) => {
                anyhow!(
                    "parse {}: {inner}\n\
                     HINT: Pass the <arch>-repodata file of a repository, not a package.",
                    path.display()
                )
            }
            other => anyhow!("parse {}: {other}", path.display()),
        },
        DumpError::Io(io_err) => {
            anyhow!("output directory {}: {io_err}", output_dir.display())
        }
        other => anyhow::Error::from(other),
    }
}

/// Converts the error of a core operation, if any.
pub fn add_dump_context<T>(
    result: Result<T, DumpError>,
    output_dir: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_dump_error(e, output_dir))
}
