//! Alias registry configuration.
//!
//! A [`KeyStoreConfig`] names each alias, the ordered files backing it, and how
//! often they are polled. It can be built in code or loaded from JSON:
//!
//! ```json
//! {
//!   "refresh_interval_secs": 5,
//!   "aliases": [
//!     { "alias": "server", "paths": ["/etc/tls/chain.pem", "/etc/tls/key.pem"] }
//!   ]
//! }
//! ```
//!
//! A refresh interval of `0` (the default) disables polling: the alias is
//! parsed once at registration. A per-alias interval overrides the registry one.

use crate::error::ConfigurationError;
use crate::source::MultiFileSource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest accepted refresh interval: one year.
pub const MAX_REFRESH_INTERVAL_SECS: i64 = 365 * 24 * 60 * 60;

/// Serializable description of every alias a key store serves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyStoreConfig {
    /// Poll period in seconds applied to aliases without their own interval.
    #[serde(default)]
    pub refresh_interval_secs: i64,

    /// Registered aliases, in registration order.
    #[serde(default)]
    pub aliases: Vec<AliasConfig>,
}

/// One alias and its backing files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasConfig {
    /// Name the alias is looked up by.
    pub alias: String,

    /// Files concatenated in order before parsing.
    pub paths: Vec<PathBuf>,

    /// Poll period in seconds overriding the registry interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<i64>,
}

impl KeyStoreConfig {
    /// Creates an empty configuration with polling disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the registry-wide poll period in seconds.
    #[must_use]
    pub fn with_refresh_interval(mut self, secs: i64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    /// Registers an alias backed by `paths`, concatenated in order.
    #[must_use]
    pub fn add_alias<I, P>(mut self, alias: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.aliases.push(AliasConfig {
            alias: alias.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            refresh_interval_secs: None,
        });
        self
    }

    /// Registers an alias with its own poll period in seconds.
    #[must_use]
    pub fn add_alias_with_interval<I, P>(
        mut self,
        alias: impl Into<String>,
        paths: I,
        secs: i64,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.aliases.push(AliasConfig {
            alias: alias.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            refresh_interval_secs: Some(secs),
        });
        self
    }

    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] if the document does not deserialize.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::Invalid(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Serializes the configuration as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ConfigurationError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }

    /// Validates the configuration and produces the alias registry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for empty or duplicate alias names,
    /// aliases without paths, and refresh intervals that are negative or above
    /// [`MAX_REFRESH_INTERVAL_SECS`].
    pub fn validate(&self) -> Result<AliasRegistry, ConfigurationError> {
        if self.refresh_interval_secs < 0 {
            return Err(ConfigurationError::NegativeDefaultRefreshInterval(
                self.refresh_interval_secs,
            ));
        }
        if self.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS {
            return Err(ConfigurationError::DefaultRefreshIntervalTooLarge(
                self.refresh_interval_secs,
            ));
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.aliases.len());

        for cfg in &self.aliases {
            if cfg.alias.is_empty() {
                return Err(ConfigurationError::EmptyAlias);
            }
            if !seen.insert(cfg.alias.as_str()) {
                return Err(ConfigurationError::DuplicateAlias(cfg.alias.clone()));
            }
            if cfg.paths.is_empty() {
                return Err(ConfigurationError::NoSources {
                    alias: cfg.alias.clone(),
                });
            }

            let secs = cfg.refresh_interval_secs.unwrap_or(self.refresh_interval_secs);
            if secs > MAX_REFRESH_INTERVAL_SECS {
                return Err(ConfigurationError::RefreshIntervalTooLarge {
                    alias: cfg.alias.clone(),
                    value: secs,
                    max: MAX_REFRESH_INTERVAL_SECS,
                });
            }
            let secs = u64::try_from(secs).map_err(|_| {
                ConfigurationError::NegativeRefreshInterval {
                    alias: cfg.alias.clone(),
                    value: secs,
                }
            })?;

            entries.push(AliasEntry {
                alias: cfg.alias.clone(),
                source: MultiFileSource::from_paths(cfg.paths.iter().cloned()),
                refresh_interval: (secs > 0).then(|| Duration::from_secs(secs)),
            });
        }

        Ok(AliasRegistry { entries })
    }
}

/// A validated alias registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasEntry {
    alias: String,
    source: MultiFileSource,
    refresh_interval: Option<Duration>,
}

impl AliasEntry {
    /// Returns the alias name.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Returns the backing files.
    pub fn source(&self) -> &MultiFileSource {
        &self.source
    }

    /// Returns the poll period, or `None` in parse-once mode.
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }
}

/// Validated aliases in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasRegistry {
    entries: Vec<AliasEntry>,
}

impl AliasRegistry {
    /// Returns the entry for `alias`.
    pub fn get(&self, alias: &str) -> Option<&AliasEntry> {
        self.entries.iter().find(|e| e.alias == alias)
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AliasEntry> {
        self.entries.iter()
    }

    /// Returns the number of aliases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no alias is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for AliasRegistry {
    type Item = AliasEntry;
    type IntoIter = std::vec::IntoIter<AliasEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_alias_interval_overrides_registry_interval() {
        let registry = KeyStoreConfig::new()
            .with_refresh_interval(5)
            .add_alias("server", ["chain.pem", "key.pem"])
            .add_alias_with_interval("admin", ["admin.pem"], 0)
            .validate()
            .unwrap();

        let server = registry.get("server").unwrap();
        assert_eq!(server.refresh_interval(), Some(Duration::from_secs(5)));
        assert_eq!(
            server.source().paths(),
            &[PathBuf::from("chain.pem"), PathBuf::from("key.pem")]
        );
        assert_eq!(registry.get("admin").unwrap().refresh_interval(), None);

        let order: Vec<_> = registry.iter().map(AliasEntry::alias).collect();
        assert_eq!(order, ["server", "admin"]);
    }

    #[test]
    fn rejects_alias_without_paths() {
        let err = KeyStoreConfig::new()
            .add_alias("server", Vec::<PathBuf>::new())
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NoSources {
                alias: "server".to_string()
            }
        );
    }

    #[test]
    fn rejects_negative_intervals() {
        let err = KeyStoreConfig::new()
            .add_alias_with_interval("server", ["a.pem"], -1)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NegativeRefreshInterval {
                alias: "server".to_string(),
                value: -1
            }
        );

        let err = KeyStoreConfig::new()
            .with_refresh_interval(-5)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::NegativeDefaultRefreshInterval(-5));
    }

    #[test]
    fn rejects_intervals_above_one_year() {
        let err = KeyStoreConfig::new()
            .add_alias_with_interval("server", ["a.pem"], i64::MAX)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::RefreshIntervalTooLarge {
                alias: "server".to_string(),
                value: i64::MAX,
                max: MAX_REFRESH_INTERVAL_SECS,
            }
        );

        let err = KeyStoreConfig::new()
            .with_refresh_interval(MAX_REFRESH_INTERVAL_SECS + 1)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DefaultRefreshIntervalTooLarge(MAX_REFRESH_INTERVAL_SECS + 1)
        );

        let registry = KeyStoreConfig::new()
            .add_alias_with_interval("server", ["a.pem"], MAX_REFRESH_INTERVAL_SECS)
            .validate()
            .unwrap();
        assert!(registry.get("server").unwrap().refresh_interval().is_some());
    }

    #[test]
    fn rejects_duplicate_and_empty_aliases() {
        let err = KeyStoreConfig::new()
            .add_alias("server", ["a.pem"])
            .add_alias("server", ["b.pem"])
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateAlias("server".to_string()));

        let err = KeyStoreConfig::new()
            .add_alias("", ["a.pem"])
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyAlias);
    }

    #[test]
    fn json_round_trip() {
        let json = r#"{
            "refresh_interval_secs": 5,
            "aliases": [
                { "alias": "server", "paths": ["chain.pem", "key.pem"] },
                { "alias": "admin", "paths": ["admin.pem"], "refresh_interval_secs": 30 }
            ]
        }"#;

        let config = KeyStoreConfig::from_json_str(json).unwrap();
        assert_eq!(
            config,
            KeyStoreConfig::new()
                .with_refresh_interval(5)
                .add_alias("server", ["chain.pem", "key.pem"])
                .add_alias_with_interval("admin", ["admin.pem"], 30)
        );

        let again = KeyStoreConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = KeyStoreConfig::from_json_str(r#"{ "refresh": 5 }"#).unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid(_)));
    }
}
