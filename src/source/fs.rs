use std::fmt::Debug;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// File primitives used by the reload engine.
///
/// Implementations must be cheap to call from a blocking worker thread.
pub trait FileSystem: Debug + Send + Sync + 'static {
    /// Reads the whole file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened or read.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Returns the file's last modification time.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be stat-ed.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}
