//! Filesystem primitives used by the selective extractor.
//!
//! Every function here takes paths that were already validated
//! ([`SafePath`], [`SafeSymlink`]) and joins them under a [`DestDir`].
//! Parent directories are created on demand, and an existing non-directory
//! at the output path is removed before anything new is written there.

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::types::DestDir;
use crate::types::SafePath;
use crate::types::SafeSymlink;

/// Write buffer size for extracted files (64KB).
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Creates the parent directories of `path` and clears a stale entry.
///
/// A symlink, regular file, or hardlink left over from an earlier run is
/// removed. Directories are left alone; writing over one fails later with
/// an I/O error.
///
/// # Errors
///
/// Returns an I/O error if a parent cannot be created or the stale entry
/// cannot be removed.
pub fn prepare_output(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(path)?,
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Writes `reader` to `safe_path` under `dest`, returning the bytes copied.
///
/// # Errors
///
/// Returns an I/O error if the output cannot be prepared, created, or
/// written.
pub fn write_file<R: Read>(reader: &mut R, safe_path: &SafePath, dest: &DestDir) -> Result<u64> {
    let output_path = dest.join(safe_path);
    prepare_output(&output_path)?;

    let file = File::create(&output_path)?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let written = io::copy(reader, &mut writer)?;
    writer.flush()?;

    Ok(written)
}

/// Creates a symbolic link from a validated symlink entry.
///
/// The target is stored verbatim.
///
/// # Platform Support
///
/// - **Unix**: `std::os::unix::fs::symlink`
/// - **Other platforms**: returns an `Unsupported` I/O error
///
/// # Errors
///
/// Returns an I/O error if the output cannot be prepared or the link
/// cannot be created.
pub fn create_symlink(safe_symlink: &SafeSymlink, dest: &DestDir) -> Result<PathBuf> {
    let link_path = dest.as_path().join(safe_symlink.link_path());
    prepare_output(&link_path)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(safe_symlink.target_path(), &link_path)?;
        Ok(link_path)
    }

    #[cfg(not(unix))]
    {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        )
        .into())
    }
}

/// Creates a hardlink at `link` pointing to the already extracted `target`.
///
/// Callers decide whether `target` was written in the current pass; this
/// only links what is on disk.
///
/// # Errors
///
/// Returns an I/O error with kind `NotFound` if `target` does not exist,
/// or any other I/O error from link creation.
pub fn create_hardlink(link: &SafePath, target: &SafePath, dest: &DestDir) -> Result<PathBuf> {
    let link_path = dest.join(link);
    let target_path = dest.join(target);

    // A missing target must not remove the stale link first.
    fs::symlink_metadata(&target_path)?;

    prepare_output(&link_path)?;
    fs::hard_link(&target_path, &link_path)?;
    Ok(link_path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::DumpError;
    use tempfile::TempDir;

    fn create_test_dest() -> (TempDir, DestDir) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::new(temp.path()).expect("failed to create dest");
        (temp, dest)
    }

    #[test]
    fn test_write_file_creates_parents() {
        let (temp, dest) = create_test_dest();
        let path = SafePath::validate("man1/foo.1").unwrap();

        let written = write_file(&mut &b".TH FOO 1"[..], &path, &dest).unwrap();
        assert_eq!(written, 9);
        assert_eq!(
            fs::read(temp.path().join("man1/foo.1")).unwrap(),
            b".TH FOO 1"
        );
    }

    #[test]
    fn test_write_file_truncates() {
        let (temp, dest) = create_test_dest();
        let path = SafePath::validate("man1/foo.1").unwrap();

        write_file(&mut &b"a much longer first version"[..], &path, &dest).unwrap();
        write_file(&mut &b"short"[..], &path, &dest).unwrap();
        assert_eq!(fs::read(temp.path().join("man1/foo.1")).unwrap(), b"short");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_file_replaces_symlink_without_following() {
        let (temp, dest) = create_test_dest();
        let outside = temp.path().join("outside");
        fs::write(&outside, b"keep").unwrap();
        fs::create_dir(temp.path().join("man1")).unwrap();
        std::os::unix::fs::symlink(&outside, temp.path().join("man1/foo.1")).unwrap();

        let path = SafePath::validate("man1/foo.1").unwrap();
        write_file(&mut &b"new"[..], &path, &dest).unwrap();

        assert_eq!(fs::read(&outside).unwrap(), b"keep");
        let meta = fs::symlink_metadata(temp.path().join("man1/foo.1")).unwrap();
        assert!(meta.is_file());
    }

    #[test]
    fn test_write_file_over_directory_fails() {
        let (temp, dest) = create_test_dest();
        fs::create_dir_all(temp.path().join("man1/foo.1")).unwrap();

        let path = SafePath::validate("man1/foo.1").unwrap();
        let result = write_file(&mut &b"x"[..], &path, &dest);
        assert!(matches!(result, Err(DumpError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_create_symlink_replaces_existing() {
        let (temp, dest) = create_test_dest();
        let link = SafePath::validate("man1/bar.1").unwrap();

        let first = SafeSymlink::validate(&link, Path::new("foo.1"), &dest).unwrap();
        create_symlink(&first, &dest).unwrap();
        let second = SafeSymlink::validate(&link, Path::new("baz.1"), &dest).unwrap();
        let created = create_symlink(&second, &dest).unwrap();

        assert_eq!(created, temp.path().join("man1/bar.1"));
        assert_eq!(fs::read_link(&created).unwrap(), Path::new("baz.1"));
    }

    #[test]
    fn test_create_hardlink() {
        let (temp, dest) = create_test_dest();
        let target = SafePath::validate("man1/foo.1").unwrap();
        let link = SafePath::validate("man1/baz.1").unwrap();
        write_file(&mut &b"shared"[..], &target, &dest).unwrap();

        create_hardlink(&link, &target, &dest).unwrap();
        assert_eq!(fs::read(temp.path().join("man1/baz.1")).unwrap(), b"shared");
    }

    #[test]
    fn test_create_hardlink_missing_target() {
        let (temp, dest) = create_test_dest();
        let target = SafePath::validate("man1/foo.1").unwrap();
        let link = SafePath::validate("man1/baz.1").unwrap();
        fs::create_dir(temp.path().join("man1")).unwrap();
        fs::write(temp.path().join("man1/baz.1"), b"stale").unwrap();

        let result = create_hardlink(&link, &target, &dest);
        assert!(
            matches!(result, Err(DumpError::Io(ref e)) if e.kind() == io::ErrorKind::NotFound)
        );
        assert!(temp.path().join("man1/baz.1").exists());
    }
}
