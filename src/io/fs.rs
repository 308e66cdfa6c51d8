use std::fs;
use std::io;
use std::path::Path;

/// Filesystem operations needed to write extracted entries.
pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` may be written. A missing file is writable.
    fn is_writable(&self, path: &Path) -> bool;

    /// Create or truncate `path` and write `data` to it.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// Creates directory trees for extracted archives.
///
/// Implementations own permission hardening and any guard files placed in
/// new directories; the extractor only decides that a directory is needed.
pub trait SecureDirectoryCreator: Send + Sync {
    fn create(&self, path: &Path) -> io::Result<()>;
}

impl<T: Filesystem + ?Sized> Filesystem for &T {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_writable(&self, path: &Path) -> bool {
        (**self).is_writable(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        (**self).write(path, data)
    }
}

impl<T: SecureDirectoryCreator + ?Sized> SecureDirectoryCreator for &T {
    fn create(&self, path: &Path) -> io::Result<()> {
        (**self).create(path)
    }
}

/// [`Filesystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFilesystem;

impl Filesystem for StdFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_writable(&self, path: &Path) -> bool {
        match fs::metadata(path) {
            Ok(meta) => !meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => true,
        }
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        fs::write(path, data)
    }
}

/// [`SecureDirectoryCreator`] that creates plain directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDirectoryCreator;

impl SecureDirectoryCreator for StdDirectoryCreator {
    fn create(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}
