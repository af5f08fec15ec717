//! Multi-file sources.
//!
//! An alias is backed by an ordered list of files (typically a certificate
//! chain file followed by a key file). [`MultiFileSource`] concatenates them
//! into the single stream the PEM parser consumes, and reports their
//! modification times for change detection.
//!
//! File access goes through the [`FileSystem`] trait so hosts (and tests) can
//! supply their own primitives.

mod fs;

pub use fs::{FileSystem, LocalFileSystem};

use crate::error::SourceReadError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Ordered list of files whose bytes are concatenated, without separators, on
/// every read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiFileSource {
    paths: Vec<PathBuf>,
}

impl MultiFileSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source from paths, keeping their order.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a path.
    #[must_use]
    pub fn add(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Returns the configured paths in concatenation order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Returns `true` if no path is configured.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Reads every file from the local file system and concatenates the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError::Read`] naming the first file that could not be read.
    pub fn read(&self) -> Result<Vec<u8>, SourceReadError> {
        self.read_with(&LocalFileSystem)
    }

    /// Reads every file through `fs` and concatenates the bytes in list order.
    ///
    /// A new buffer is built on every call; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError::Read`] naming the first file that could not be read.
    pub fn read_with(&self, fs: &dyn FileSystem) -> Result<Vec<u8>, SourceReadError> {
        let mut out = Vec::new();
        for (index, path) in self.paths.iter().enumerate() {
            let bytes = fs.read(path).map_err(|source| SourceReadError::Read {
                index,
                path: path.clone(),
                source,
            })?;
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    /// Returns the modification time of every file, in list order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError::Stat`] naming the first file that could not be stat-ed.
    pub fn modified_times(&self, fs: &dyn FileSystem) -> Result<Vec<SystemTime>, SourceReadError> {
        self.paths
            .iter()
            .enumerate()
            .map(|(index, path)| {
                fs.modified(path).map_err(|source| SourceReadError::Stat {
                    index,
                    path: path.clone(),
                    source,
                })
            })
            .collect()
    }
}

impl<P: AsRef<Path>> FromIterator<P> for MultiFileSource {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::from_paths(iter.into_iter().map(|p| p.as_ref().to_path_buf()))
    }
}
