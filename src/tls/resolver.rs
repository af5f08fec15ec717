use super::crypto::install_bundled_provider;
use super::material::certified_key_from_bundle;
use crate::error::{Error, Result};
use crate::keystore::PemKeyStore;
use crate::pem::PemBundle;
use crate::prelude::{debug, warn};
use arc_swap::ArcSwapOption;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// Signing material built from one published bundle.
struct CachedKey {
    bundle: Arc<PemBundle>,
    certified: Arc<CertifiedKey>,
}

/// rustls certificate resolver backed by a [`PemKeyStore`].
///
/// The SNI server name is tried as an alias first; otherwise the default alias
/// is used. Each handshake reads the bundle published at that moment, so a
/// reload takes effect on the next handshake without touching the
/// `ServerConfig`. Signing keys are rebuilt only when the published bundle changes.
pub struct PemCertResolver {
    store: PemKeyStore,
    default_alias: Option<String>,
    cache: HashMap<String, ArcSwapOption<CachedKey>>,
}

impl std::fmt::Debug for PemCertResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PemCertResolver")
            .field("store", &self.store)
            .field("default_alias", &self.default_alias)
            .field("cache", &"<HashMap<String, ArcSwapOption<CertifiedKey>>>")
            .finish()
    }
}

impl PemCertResolver {
    /// Creates a resolver over every alias registered in `store`.
    pub fn new(store: PemKeyStore, default_alias: Option<String>) -> Self {
        let cache = store
            .aliases()
            .into_iter()
            .map(|alias| (alias, ArcSwapOption::empty()))
            .collect();
        Self {
            store,
            default_alias,
            cache,
        }
    }

    /// Returns the signing material for `alias`'s current bundle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown alias and [`Error::Tls`] if the
    /// bundle cannot be used to sign.
    pub fn certified_key(&self, alias: &str) -> Result<Arc<CertifiedKey>> {
        let bundle = self.store.select(alias)?;
        let slot = self.cache.get(alias).ok_or_else(|| Error::NotFound {
            alias: alias.to_string(),
        })?;

        if let Some(cached) = slot.load_full() {
            if Arc::ptr_eq(&cached.bundle, &bundle) {
                return Ok(Arc::clone(&cached.certified));
            }
        }

        let certified = certified_key_from_bundle(&bundle)?;
        debug!("Built signing key for alias: alias={alias}");
        slot.store(Some(Arc::new(CachedKey {
            bundle,
            certified: Arc::clone(&certified),
        })));
        Ok(certified)
    }

    fn alias_for<'a>(&'a self, server_name: Option<&'a str>) -> Option<&'a str> {
        server_name
            .filter(|name| self.cache.contains_key(*name))
            .or(self.default_alias.as_deref())
    }
}

impl ResolvesServerCert for PemCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let alias = self.alias_for(client_hello.server_name())?;
        match self.certified_key(alias) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("No usable credentials for handshake: alias={alias}, error={e}");
                None
            }
        }
    }
}

/// Builds a rustls server configuration that serves credentials from `store`.
///
/// Installs the crate's crypto provider as the process default if none is set.
/// If `default_alias` is given it must resolve now, so a misconfiguration
/// surfaces here rather than on the first handshake.
///
/// # Errors
///
/// Returns [`Error::NotFound`] or [`Error::Tls`] if the default alias cannot
/// produce signing material.
///
/// # Examples
///
/// ```no_run
/// use pem_keystore::{tls, PemKeyStore, ProviderKind};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PemKeyStore::builder()
///     .kind(ProviderKind::Reloadable)
///     .refresh_interval(5)
///     .alias("server", ["/etc/tls/chain.pem", "/etc/tls/key.pem"])
///     .build()?;
/// store.start()?;
///
/// let config = Arc::new(tls::server_config(store, Some("server"))?);
/// # Ok(())
/// # }
/// ```
pub fn server_config(store: PemKeyStore, default_alias: Option<&str>) -> Result<ServerConfig> {
    install_bundled_provider();

    let resolver = PemCertResolver::new(store, default_alias.map(str::to_string));
    if let Some(alias) = default_alias {
        resolver.certified_key(alias)?;
    }

    let resolver: Arc<dyn ResolvesServerCert> = Arc::new(resolver);
    Ok(ServerConfig::builder()
        .with_no_client_auth()
        .with_cert_resolver(resolver))
}
