#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Reloadable TLS server credentials sourced from PEM files.
//!
//! Each named alias is backed by an ordered list of PEM files (for example a
//! chain file followed by a key file). The files are concatenated, parsed into
//! an immutable [`PemBundle`], and published. A reloadable store polls the
//! files' modification times and republishes atomically when they change, so
//! certificates rotated on disk by an external agent are picked up by new
//! handshakes without a restart. Failed reloads keep the last good bundle.
//!
//! ## Example
//!
//! ```no_run
//! use pem_keystore::{tls, PemKeyStore, ProviderKind};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PemKeyStore::builder()
//!     .kind(ProviderKind::Reloadable)
//!     .refresh_interval(5)
//!     .alias("server", ["/etc/tls/chain.pem", "/etc/tls/key.pem"])
//!     .build()?;
//! store.start()?;
//!
//! // Handshake-time lookup.
//! let bundle = store.select("server")?;
//! println!("serving {}", bundle.leaf_certificate().ok_or("no cert")?.subject()?);
//!
//! // Or hand the whole store to rustls.
//! let config = Arc::new(tls::server_config(store.clone(), Some("server"))?);
//! # let _ = config;
//!
//! store.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! * `logging` (default): emit records through the `log` crate.
//! * `tracing`: emit records through `tracing` instead.
//! * `ring` (default) / `aws-lc-rs`: rustls crypto provider. Exactly one must be enabled.

#[cfg(all(feature = "ring", feature = "aws-lc-rs"))]
compile_error!("Enable only one crypto provider feature: `ring` or `aws-lc-rs`.");

#[cfg(not(any(feature = "ring", feature = "aws-lc-rs")))]
compile_error!("Enable one crypto provider feature: `ring` (default) or `aws-lc-rs`.");

pub mod cert;
pub mod config;
pub mod error;
pub mod keystore;
pub mod pem;
pub mod provider;
pub mod source;
pub mod tls;

mod observability;
mod prelude;
mod select;

#[cfg(test)]
mod test_support;

pub use crate::cert::{Certificate, KeyAlgorithm, KeyFormat, PrivateKey};
pub use crate::config::{AliasConfig, KeyStoreConfig};
pub use crate::error::{Error, Result};
pub use crate::keystore::{KeyStoreUpdates, PemKeyStore, PemKeyStoreBuilder};
pub use crate::pem::{parse_bundle, KeyPairStatus, PemBundle};
pub use crate::provider::ProviderKind;
pub use crate::source::MultiFileSource;
