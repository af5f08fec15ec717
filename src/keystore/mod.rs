//! Reload engine and snapshot publisher.
//!
//! [`PemKeyStore`] holds one published [`PemBundle`](crate::pem::PemBundle) per
//! alias. Readers take an atomic snapshot; a reload builds a complete new
//! bundle off to the side and swaps it in with a single store, so a reader
//! sees either the old bundle or the new one and never a mix.
//!
//! Change detection is by file modification time: a poll first stats every
//! file of the alias and only re-reads and re-parses when at least one time
//! differs from the times recorded with the published bundle. A failed
//! reload leaves the published bundle, and its recorded times, untouched, so
//! the change is retried on the next tick.
//!
//! Primary types are re-exported at the crate root. For metrics integration
//! (`MetricsRecorder`, `MetricsErrorKind`), import from this module.
//!
//! # Example
//!
//! ```no_run
//! use pem_keystore::{PemKeyStore, ProviderKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PemKeyStore::builder()
//!     .kind(ProviderKind::Reloadable)
//!     .refresh_interval(5)
//!     .alias("server", ["/etc/tls/chain.pem", "/etc/tls/key.pem"])
//!     .build()?;
//! store.start()?;
//!
//! let bundle = store.select("server")?;
//! assert!(bundle.has_key());
//!
//! store.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod builder;
mod failures;
mod metrics;
mod store;
mod supervisor;

pub use builder::PemKeyStoreBuilder;
pub use metrics::{MetricsErrorKind, MetricsRecorder};
pub use store::{KeyStoreUpdates, PemKeyStore};
