//! Named provider construction.
//!
//! Hosts discover the key store by name. Both names build the same
//! alias/bundle machinery; they differ only in whether reload timers run.
//!
//! | name              | kind                        | behavior               |
//! |-------------------|-----------------------------|------------------------|
//! | `simplepem`       | [`ProviderKind::Static`]     | parse once             |
//! | `simplepemreload` | [`ProviderKind::Reloadable`] | poll by refresh period |

use crate::config::KeyStoreConfig;
use crate::error::{ConfigurationError, Result};
use crate::keystore::PemKeyStore;
use std::fmt;
use std::str::FromStr;

/// Provider variant of a [`PemKeyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    /// Parse every alias once at registration; never poll.
    #[default]
    Static,
    /// Poll every alias with a non-zero refresh interval after [`PemKeyStore::start`].
    Reloadable,
}

impl ProviderKind {
    /// Registration name of the static provider.
    pub const STATIC_NAME: &'static str = "simplepem";

    /// Registration name of the reloadable provider.
    pub const RELOADABLE_NAME: &'static str = "simplepemreload";

    /// Returns the registration name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Static => Self::STATIC_NAME,
            Self::Reloadable => Self::RELOADABLE_NAME,
        }
    }

    /// Looks a provider up by registration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::STATIC_NAME => Some(Self::Static),
            Self::RELOADABLE_NAME => Some(Self::Reloadable),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ConfigurationError::UnknownProvider(s.to_string()))
    }
}

/// Builds the provider registered under `name` from `config`.
///
/// The store is parsed and ready to serve. For the reloadable provider call
/// [`PemKeyStore::start`] to arm the timers.
///
/// # Errors
///
/// Returns [`ConfigurationError::UnknownProvider`] for an unknown name, and
/// otherwise any error of [`crate::PemKeyStoreBuilder::build`].
///
/// # Examples
///
/// ```no_run
/// use pem_keystore::{provider, KeyStoreConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = KeyStoreConfig::from_json_file("/etc/tls/keystore.json")?;
/// let store = provider::build("simplepemreload", &config)?;
/// store.start()?;
/// # Ok(())
/// # }
/// ```
pub fn build(name: &str, config: &KeyStoreConfig) -> Result<PemKeyStore> {
    let kind: ProviderKind = name.parse()?;
    PemKeyStore::builder()
        .kind(kind)
        .config(config.clone())
        .build()
}
