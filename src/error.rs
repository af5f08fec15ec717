//! Error types returned by the key store.

use crate::cert::error::{CertificateError, PrivateKeyError};
use std::io;
use std::path::{Path, PathBuf};

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by `pem-keystore`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A configured source file could not be read or stat-ed.
    #[error(transparent)]
    SourceRead(#[from] SourceReadError),

    /// Source content did not decode as PEM certificates and keys.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The private key does not belong to the leaf certificate.
    #[error("private key does not belong to the leaf certificate {leaf_subject:?}")]
    KeyMismatch {
        /// Subject of the leaf certificate the key was paired with.
        leaf_subject: String,
    },

    /// The key store configuration was rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// No bundle is published for the alias (never registered, or never parsed).
    #[error("no credentials published for alias {alias:?}")]
    NotFound {
        /// The requested alias.
        alias: String,
    },

    /// The key store was shut down and no longer publishes updates.
    #[error("key store is closed")]
    Closed,

    /// Reload tasks need a Tokio runtime and none is running.
    #[error("reload tasks require a running Tokio runtime")]
    NoRuntime,

    /// Background reload tasks did not stop within the shutdown timeout.
    #[error("shutdown timeout exceeded")]
    ShutdownTimeout,

    /// Published material could not be turned into TLS credentials.
    #[error("failed building TLS credentials: {0}")]
    Tls(String),
}

/// A configured source path could not be read.
#[derive(Debug, thiserror::Error)]
pub enum SourceReadError {
    /// Opening or reading the file failed.
    #[error("failed reading source #{index} ({}): {source}", .path.display())]
    Read {
        /// Position of the source in the alias' path list.
        index: usize,
        /// The configured path.
        path: PathBuf,
        /// The underlying I/O failure.
        source: io::Error,
    },

    /// Reading the modification time failed.
    #[error("failed reading modification time of source #{index} ({}): {source}", .path.display())]
    Stat {
        /// Position of the source in the alias' path list.
        index: usize,
        /// The configured path.
        path: PathBuf,
        /// The underlying I/O failure.
        source: io::Error,
    },
}

impl SourceReadError {
    /// Returns the position of the failing source in its path list.
    pub fn index(&self) -> usize {
        match self {
            Self::Read { index, .. } | Self::Stat { index, .. } => *index,
        }
    }

    /// Returns the failing path.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Stat { path, .. } => path,
        }
    }
}

/// A PEM block could not be decoded.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("failed parsing PEM block #{block}: {kind}")]
pub struct ParseError {
    block: usize,
    #[source]
    kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(block: usize, kind: impl Into<ParseErrorKind>) -> Self {
        Self {
            block,
            kind: kind.into(),
        }
    }

    /// Zero-based index of the offending block in stream order.
    pub fn block(&self) -> usize {
        self.block
    }

    /// The decode cause.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

/// Why a PEM block was rejected.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// The PEM armor or its base64 payload is malformed.
    #[error("malformed PEM encoding: {0}")]
    Pem(String),

    /// The block label is neither a certificate nor a supported private key.
    #[error("unrecognized PEM label {0:?}")]
    UnknownLabel(String),

    /// A certificate block does not hold a valid X.509 certificate.
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// A key block does not hold a decodable private key.
    #[error(transparent)]
    PrivateKey(#[from] PrivateKeyError),
}

/// The key store configuration was rejected before any background task started.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// An alias with an empty name.
    #[error("alias name must not be empty")]
    EmptyAlias,

    /// The same alias was registered twice.
    #[error("alias {0:?} is registered more than once")]
    DuplicateAlias(String),

    /// An alias without any source path.
    #[error("alias {alias:?} has no source paths")]
    NoSources {
        /// The offending alias.
        alias: String,
    },

    /// A per-alias refresh interval below zero.
    #[error("alias {alias:?} has negative refresh interval {value}s")]
    NegativeRefreshInterval {
        /// The offending alias.
        alias: String,
        /// The configured value in seconds.
        value: i64,
    },

    /// A per-alias refresh interval above
    /// [`MAX_REFRESH_INTERVAL_SECS`](crate::config::MAX_REFRESH_INTERVAL_SECS).
    #[error("alias {alias:?} has refresh interval {value}s, above the {max}s limit")]
    RefreshIntervalTooLarge {
        /// The offending alias.
        alias: String,
        /// The configured value in seconds.
        value: i64,
        /// The largest accepted value in seconds.
        max: i64,
    },

    /// A registry-wide refresh interval above
    /// [`MAX_REFRESH_INTERVAL_SECS`](crate::config::MAX_REFRESH_INTERVAL_SECS).
    #[error(
        "default refresh interval {0}s is above the {max}s limit",
        max = crate::config::MAX_REFRESH_INTERVAL_SECS
    )]
    DefaultRefreshIntervalTooLarge(i64),

    /// A registry-wide refresh interval below zero.
    #[error("negative default refresh interval {0}s")]
    NegativeDefaultRefreshInterval(i64),

    /// No provider is registered under the name.
    #[error("unknown provider {0:?}")]
    UnknownProvider(String),

    /// A configuration document could not be read or deserialized.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
