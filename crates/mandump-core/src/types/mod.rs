//! Validated wrappers used during selective extraction.
//!
//! Output locations are only ever computed from a [`SafePath`], and a
//! [`SafePath`] can only be obtained by validating an archive entry name.
//! Symlinks must additionally pass through [`SafeSymlink`].

pub mod dest_dir;
pub mod entry_kind;
pub mod safe_path;
pub mod safe_symlink;
pub mod wanted;

pub use dest_dir::DestDir;
pub use entry_kind::EntryKind;
pub use safe_path::SafePath;
pub use safe_path::normalize_entry_name;
pub use safe_symlink::SafeSymlink;
pub use wanted::WantedSet;
