use super::metrics::MetricsRecorder;
use super::store::PemKeyStore;
use crate::config::KeyStoreConfig;
use crate::error::Result;
use crate::provider::ProviderKind;
use crate::source::{FileSystem, LocalFileSystem};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`PemKeyStore`].
///
/// Defaults: [`ProviderKind::Static`], refresh interval `0` (parse once), local
/// file system, no metrics, no shutdown timeout.
///
/// # Examples
///
/// ```no_run
/// use pem_keystore::{PemKeyStoreBuilder, ProviderKind};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PemKeyStoreBuilder::new()
///     .kind(ProviderKind::Reloadable)
///     .refresh_interval(5)
///     .alias("server", ["/etc/tls/chain.pem", "/etc/tls/key.pem"])
///     .alias_with_interval("admin", ["/etc/tls/admin.pem"], 60)
///     .shutdown_timeout(Some(Duration::from_secs(5)))
///     .build()?;
/// store.start()?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub struct PemKeyStoreBuilder {
    config: KeyStoreConfig,
    kind: ProviderKind,
    fs: Option<Arc<dyn FileSystem>>,
    metrics: Option<Arc<dyn MetricsRecorder>>,
    shutdown_timeout: Option<Duration>,
}

impl Debug for PemKeyStoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PemKeyStoreBuilder")
            .field("config", &self.config)
            .field("kind", &self.kind)
            .field("fs", &self.fs)
            .field(
                "metrics",
                &self.metrics.as_ref().map(|_| "<MetricsRecorder>"),
            )
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Default for PemKeyStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PemKeyStoreBuilder {
    /// Creates a builder with no aliases.
    pub fn new() -> Self {
        Self {
            config: KeyStoreConfig::default(),
            kind: ProviderKind::Static,
            fs: None,
            metrics: None,
            shutdown_timeout: None,
        }
    }

    /// Replaces the alias registry configuration.
    pub fn config(mut self, config: KeyStoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Selects the provider variant.
    pub fn kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the registry-wide refresh interval in seconds. `0` disables polling.
    ///
    /// Negative values are rejected by [`PemKeyStoreBuilder::build`].
    pub fn refresh_interval(mut self, secs: i64) -> Self {
        self.config.refresh_interval_secs = secs;
        self
    }

    /// Registers an alias backed by `paths`, concatenated in order.
    pub fn alias<I, P>(mut self, alias: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config = self.config.add_alias(alias, paths);
        self
    }

    /// Registers an alias with its own refresh interval in seconds.
    pub fn alias_with_interval<I, P>(mut self, alias: impl Into<String>, paths: I, secs: i64) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config = self.config.add_alias_with_interval(alias, paths, secs);
        self
    }

    /// Uses `fs` instead of the local file system for stat and read.
    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Sets a metrics recorder for reload activity.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the timeout used by [`PemKeyStore::shutdown_configured`].
    pub fn shutdown_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validates the registry and parses every alias once.
    ///
    /// The returned store serves immediately. Reload timers are armed separately
    /// by [`PemKeyStore::start`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for an invalid registry, or the
    /// read or parse error of the first alias whose sources fail.
    pub fn build(self) -> Result<PemKeyStore> {
        let registry = self.config.validate()?;
        let fs = self.fs.unwrap_or_else(|| Arc::new(LocalFileSystem));
        PemKeyStore::build_with(
            self.kind,
            registry,
            fs,
            self.metrics,
            self.shutdown_timeout,
        )
    }
}
