//! Handshake-time credential selection and alias introspection.
//!
//! All lookups read the bundle published at the moment of the call and never
//! wait on a reload. Two calls may return different bundles if a reload
//! completed in between; everything taken from one returned bundle is
//! mutually consistent.

use crate::cert::{Certificate, PrivateKey};
use crate::error::{Error, Result};
use crate::keystore::PemKeyStore;
use crate::pem::PemBundle;
use std::sync::Arc;
use time::OffsetDateTime;

impl PemKeyStore {
    /// Returns the bundle currently published for `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no bundle is published under `alias`.
    pub fn select(&self, alias: &str) -> Result<Arc<PemBundle>> {
        self.published(alias).ok_or_else(|| Error::NotFound {
            alias: alias.to_string(),
        })
    }

    /// Returns the bundle for `alias`, or `None` if there is none.
    pub fn try_select(&self, alias: &str) -> Option<Arc<PemBundle>> {
        self.published(alias)
    }

    /// Returns the first alias, in registration order, whose leaf certificate
    /// was issued by one of `issuers`, together with its bundle.
    ///
    /// `issuers` are DER-encoded distinguished names, as sent by peers in a
    /// certificate request. Aliases without a certificate never match.
    pub fn select_by_issuer<I>(&self, issuers: &[I]) -> Option<(&str, Arc<PemBundle>)>
    where
        I: AsRef<[u8]>,
    {
        self.published_in_order().find(|(_, bundle)| {
            bundle
                .leaf_certificate()
                .and_then(|leaf| leaf.issuer_der().ok())
                .is_some_and(|issuer| issuers.iter().any(|i| i.as_ref() == issuer.as_slice()))
        })
    }

    /// Returns the registered aliases in registration order.
    pub fn aliases(&self) -> Vec<String> {
        self.alias_names().map(str::to_string).collect()
    }

    /// Returns `true` if `alias` is registered.
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.has_alias(alias)
    }

    /// Returns the number of registered aliases.
    pub fn len(&self) -> usize {
        self.alias_names().count()
    }

    /// Returns `true` if no alias is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the alias' bundle holds a certificate.
    pub fn has_certificate(&self, alias: &str) -> bool {
        self.published(alias).is_some_and(|b| b.has_certificate())
    }

    /// Returns `true` if the alias' bundle holds a private key.
    pub fn has_key(&self, alias: &str) -> bool {
        self.published(alias).is_some_and(|b| b.has_key())
    }

    /// Returns the alias' certificate chain, leaf first, or `None` if the alias
    /// is unknown or has no certificate.
    pub fn certificate_chain(&self, alias: &str) -> Option<Vec<Certificate>> {
        self.published(alias)
            .filter(|b| b.has_certificate())
            .map(|b| b.certificate_chain().to_vec())
    }

    /// Returns the alias' leaf certificate.
    pub fn leaf_certificate(&self, alias: &str) -> Option<Certificate> {
        self.published(alias)
            .and_then(|b| b.leaf_certificate().cloned())
    }

    /// Returns the alias' private key.
    pub fn private_key(&self, alias: &str) -> Option<PrivateKey> {
        self.published(alias).and_then(|b| b.private_key().cloned())
    }

    /// Returns when the alias' current bundle was parsed.
    pub fn creation_date(&self, alias: &str) -> Option<OffsetDateTime> {
        self.published(alias).map(|b| b.created_at())
    }

    /// Returns `true` iff `candidate` equals the alias' leaf certificate.
    ///
    /// `None`, an unknown alias, or an alias without a certificate never match.
    pub fn matches_certificate(&self, alias: &str, candidate: Option<&Certificate>) -> bool {
        self.published(alias)
            .is_some_and(|b| b.matches_certificate(candidate))
    }

    /// Returns the first alias, in registration order, whose leaf certificate
    /// equals `candidate`.
    pub fn certificate_alias(&self, candidate: &Certificate) -> Option<&str> {
        self.published_in_order()
            .find(|(_, bundle)| bundle.matches_certificate(Some(candidate)))
            .map(|(alias, _)| alias)
    }
}
