//! rustls integration.
//!
//! [`PemCertResolver`] plugs a [`PemKeyStore`](crate::PemKeyStore) into
//! rustls as a `ResolvesServerCert`, and [`server_config`] builds a ready
//! `ServerConfig` around it. New handshakes pick up reloaded credentials
//! automatically.
//!
//! Exactly one crypto provider feature must be enabled: `ring` (default) or
//! `aws-lc-rs`.

mod crypto;
pub(crate) mod material;
mod resolver;

pub use resolver::{server_config, PemCertResolver};
