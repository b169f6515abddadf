//! Incremental man page extraction from XBPS binary packages.
//!
//! `mandump-core` reads XBPS repository indices (`<arch>-repodata`), looks
//! up each package's file manifest, and extracts only the paths under a
//! prefix (`/usr/share/man/` by default) into an output directory. A state
//! file keyed by package SHA-256 makes repeated runs skip packages that
//! were already processed.
//!
//! Symlinks are only recreated when they point at a sibling file, and
//! hardlinks only when their target lies under the same prefix.
//!
//! # Examples
//!
//! ```no_run
//! use mandump_core::DumpConfig;
//! use mandump_core::Harvester;
//! use mandump_core::NoopReporter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DumpConfig::default().with_output_dir("/srv/man");
//! let report = Harvester::new(config)?.run(&["/repo/x86_64-repodata"], &mut NoopReporter)?;
//! println!("Extracted {} files", report.extraction.files_extracted);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod harvest;
pub mod report;
pub mod security;
pub mod state;
pub mod types;

#[doc(hidden)]
pub mod test_utils;

pub use config::DumpConfig;
pub use error::DumpError;
pub use error::Result;
pub use harvest::Harvester;
pub use report::CollectingReporter;
pub use report::Diagnostic;
pub use report::ExtractionReport;
pub use report::HarvestReport;
pub use report::NoopReporter;
pub use report::Reporter;
pub use state::ExtractionState;

pub use types::DestDir;
pub use types::EntryKind;
pub use types::SafePath;
pub use types::SafeSymlink;
