use super::crypto::active_provider;
use crate::cert::{Certificate, KeyFormat, PrivateKey};
use crate::error::{Error, Result};
use crate::pem::{KeyPairStatus, PemBundle};
use rustls::pki_types::{
    CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
};
use rustls::sign::{CertifiedKey, SigningKey};
use std::sync::Arc;

fn load_signing_key(key: &PrivateKey) -> Result<Arc<dyn SigningKey>> {
    let der = key.as_bytes().to_vec();
    let key_der = match key.format() {
        KeyFormat::Pkcs8 => PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)),
        KeyFormat::Pkcs1 => PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(der)),
        KeyFormat::Sec1 => PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(der)),
    };

    active_provider()
        .key_provider
        .load_private_key(key_der)
        .map_err(|e| Error::Tls(format!("{e:?}")))
}

// `None` when the provider cannot derive the public half of the key.
fn public_key_matches(signing_key: &dyn SigningKey, leaf: &Certificate) -> Option<bool> {
    let derived = signing_key.public_key()?;
    let expected = leaf.public_key_der().ok()?;
    Some(derived.as_ref() == expected.as_slice())
}

/// Compares the bundle's private key with the leaf's public key.
pub(crate) fn key_pair_status(bundle: &PemBundle) -> KeyPairStatus {
    let (Some(leaf), Some(key)) = (bundle.leaf_certificate(), bundle.private_key()) else {
        return KeyPairStatus::Incomplete;
    };
    let Ok(signing_key) = load_signing_key(key) else {
        return KeyPairStatus::Unverifiable;
    };
    match public_key_matches(signing_key.as_ref(), leaf) {
        Some(true) => KeyPairStatus::Matched,
        Some(false) => KeyPairStatus::Mismatched,
        None => KeyPairStatus::Unverifiable,
    }
}

/// Builds a rustls `CertifiedKey` from a bundle's chain and private key.
///
/// ## Errors
///
/// Returns [`Error::Tls`] if the bundle lacks a certificate or key, the
/// provider rejects the key, or the key does not belong to the leaf.
pub(crate) fn certified_key_from_bundle(bundle: &PemBundle) -> Result<Arc<CertifiedKey>> {
    let leaf = bundle
        .leaf_certificate()
        .ok_or_else(|| Error::Tls("bundle has no certificate".into()))?;
    let key = bundle
        .private_key()
        .ok_or_else(|| Error::Tls("bundle has no private key".into()))?;

    let signing_key = load_signing_key(key)?;
    if public_key_matches(signing_key.as_ref(), leaf) == Some(false) {
        return Err(Error::Tls(
            "private key does not belong to the leaf certificate".into(),
        ));
    }

    let chain: Vec<CertificateDer<'static>> = bundle
        .certificate_chain()
        .iter()
        .map(|cert| CertificateDer::from(cert.as_bytes().to_vec()))
        .collect();

    Ok(Arc::new(CertifiedKey::new(chain, signing_key)))
}
