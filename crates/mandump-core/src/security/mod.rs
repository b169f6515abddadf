//! Link policy enforcement.

pub mod hardlink;
pub mod symlink;

pub use hardlink::HardlinkTracker;
pub use hardlink::PendingHardlink;
pub use symlink::validate_symlink;
