//! PEM bundle parsing.
//!
//! A bundle is the immutable result of decoding one byte stream made of
//! concatenated PEM blocks: zero or more certificates (leaf first) and at most
//! one private key.
//!
//! # Example
//!
//! ```no_run
//! use pem_keystore::pem::parse_bundle;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("server.pem")?;
//! let bundle = parse_bundle(&bytes)?;
//!
//! if let Some(leaf) = bundle.leaf_certificate() {
//!     println!("serving as {}", leaf.subject()?);
//! }
//! # Ok(())
//! # }
//! ```

mod parser;

pub use parser::parse_bundle;

use crate::cert::{Certificate, PrivateKey};
use time::OffsetDateTime;

/// Whether a bundle's private key belongs to its leaf certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPairStatus {
    /// The key's public half equals the leaf's subject public key.
    Matched,
    /// The key belongs to some other certificate.
    Mismatched,
    /// The bundle lacks the leaf or the key.
    Incomplete,
    /// The crypto provider cannot load the key or derive its public half.
    Unverifiable,
}

/// Certificate chain and optional private key decoded from one PEM stream.
///
/// The chain keeps stream order; the first certificate is treated as the leaf.
/// A bundle is never modified after parsing; a newer parse supersedes it.
#[derive(Debug, Clone)]
pub struct PemBundle {
    chain: Vec<Certificate>,
    key: Option<PrivateKey>,
    created_at: OffsetDateTime,
}

impl PemBundle {
    /// Creates a bundle stamped with the current time.
    pub fn new(chain: Vec<Certificate>, key: Option<PrivateKey>) -> Self {
        Self {
            chain,
            key,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns `true` if the chain holds at least one certificate.
    pub fn has_certificate(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Returns `true` if a private key is present.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Returns the certificate chain, leaf first. May be empty.
    pub fn certificate_chain(&self) -> &[Certificate] {
        &self.chain
    }

    /// Returns the first certificate of the chain.
    pub fn leaf_certificate(&self) -> Option<&Certificate> {
        self.chain.first()
    }

    /// Returns the private key, if the stream contained one.
    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.key.as_ref()
    }

    /// Returns when parsing of this bundle completed.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Returns `true` iff `candidate` is the leaf certificate, byte for byte.
    ///
    /// Other members of the chain never match.
    pub fn matches_certificate(&self, candidate: Option<&Certificate>) -> bool {
        match (candidate, self.leaf_certificate()) {
            (Some(candidate), Some(leaf)) => candidate == leaf,
            _ => false,
        }
    }

    /// Checks whether the private key belongs to the leaf certificate by
    /// deriving its public key with the rustls crypto provider.
    pub fn key_pair_status(&self) -> KeyPairStatus {
        crate::tls::material::key_pair_status(self)
    }

    /// Returns `true` only if the private key is known to belong to the leaf.
    pub fn key_matches_leaf(&self) -> bool {
        self.key_pair_status() == KeyPairStatus::Matched
    }

    /// Returns `true` if both bundles hold the same chain and key, ignoring
    /// creation time.
    pub fn same_material(&self, other: &PemBundle) -> bool {
        self.chain == other.chain && self.key == other.key
    }
}
