use std::fmt;

/// Metrics hook for reload activity.
///
/// Implement this trait to integrate with your metrics system (e.g., Prometheus, `StatsD`).
/// Aliases are operator-chosen and few, so they are passed as labels.
///
/// # Example
///
/// ```no_run
/// use pem_keystore::keystore::{MetricsErrorKind, MetricsRecorder};
/// use std::sync::Arc;
///
/// struct MyMetrics;
///
/// impl MetricsRecorder for MyMetrics {
///     fn record_reload(&self, alias: &str) {
///         println!("reloaded {alias}");
///     }
///
///     fn record_error(&self, alias: &str, kind: MetricsErrorKind) {
///         println!("reload of {alias} failed: {}", kind.as_str());
///     }
/// }
///
/// let metrics = Arc::new(MyMetrics);
/// // Use with PemKeyStoreBuilder::metrics()
/// ```
pub trait MetricsRecorder: Send + Sync {
    /// Records that a new bundle was published for `alias`.
    fn record_reload(&self, alias: &str);

    /// Records a poll that found no file changes for `alias`.
    fn record_unchanged(&self, _alias: &str) {}

    /// Records a failed or skipped reload of `alias`.
    fn record_error(&self, alias: &str, kind: MetricsErrorKind);
}

/// Error kinds reported through [`MetricsRecorder::record_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MetricsErrorKind {
    /// A source file could not be read.
    SourceRead,
    /// A source file's modification time could not be read.
    Stat,
    /// The concatenated sources did not parse.
    Parse,
    /// The private key does not belong to the leaf certificate.
    KeyMismatch,
    /// A timer tick found another reload of the alias in progress.
    ReloadSkippedOverlap,
    /// A reload step panicked or was cancelled.
    TaskJoinFailed,
}

impl MetricsErrorKind {
    /// Returns a stable label for the error kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SourceRead => "source_read",
            Self::Stat => "stat",
            Self::Parse => "parse",
            Self::KeyMismatch => "key_mismatch",
            Self::ReloadSkippedOverlap => "reload_skipped_overlap",
            Self::TaskJoinFailed => "task_join_failed",
        }
    }
}

impl fmt::Display for MetricsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
