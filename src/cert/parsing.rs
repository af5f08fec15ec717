//! Internal parsing helpers for X.509 certificates and private keys.

use crate::cert::error::{CertificateError, PrivateKeyError};
use crate::cert::KeyAlgorithm;
use asn1::ASN1Block;
use pkcs8::PrivateKeyInfo;
use x509_parser::certificate::X509Certificate;
use x509_parser::error::X509Error;
use x509_parser::nom::Err;

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_RSASSA_PSS: &str = "1.2.840.113549.1.1.10";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_ED25519: &str = "1.3.101.112";
const OID_ED448: &str = "1.3.101.113";

/// Number of leading INTEGER fields in an RSAPrivateKey (RFC 8017, A.1.2).
const PKCS1_INTEGER_FIELDS: usize = 9;

/// Parses the given DER-encoded bytes as a single X.509 certificate.
///
/// Trailing bytes after the certificate are rejected.
pub(crate) fn parse_der_encoded_bytes_as_x509_certificate(
    der_bytes: &[u8],
) -> Result<X509Certificate<'_>, CertificateError> {
    match x509_parser::parse_x509_certificate(der_bytes) {
        Ok((rest, _)) if !rest.is_empty() => Err(CertificateError::TrailingBytes(rest.len())),
        Ok((_, cert)) => Ok(cert),
        Err(Err::Incomplete(_)) => Err(CertificateError::ParseX509Certificate(
            X509Error::InvalidCertificate,
        )),
        Err(Err::Error(e) | Err::Failure(e)) => Err(CertificateError::ParseX509Certificate(e)),
    }
}

pub(crate) fn key_algorithm_from_oid(oid: &str) -> KeyAlgorithm {
    match oid {
        OID_RSA_ENCRYPTION | OID_RSASSA_PSS => KeyAlgorithm::Rsa,
        OID_EC_PUBLIC_KEY => KeyAlgorithm::Ec,
        OID_ED25519 => KeyAlgorithm::Ed25519,
        OID_ED448 => KeyAlgorithm::Ed448,
        other => KeyAlgorithm::Other(other.to_string()),
    }
}

/// Decodes a PKCS#8 `PrivateKeyInfo` and returns the algorithm it declares.
pub(crate) fn decode_pkcs8(der: &[u8]) -> Result<KeyAlgorithm, PrivateKeyError> {
    let info = PrivateKeyInfo::try_from(der).map_err(PrivateKeyError::DecodePkcs8)?;
    Ok(key_algorithm_from_oid(&info.algorithm.oid.to_string()))
}

/// Checks that `der` is a PKCS#1 `RSAPrivateKey`.
pub(crate) fn decode_pkcs1(der: &[u8]) -> Result<KeyAlgorithm, PrivateKeyError> {
    const FORMAT: &str = "PKCS#1";
    let fields = single_sequence(der, FORMAT)?;

    let well_formed = fields.len() >= PKCS1_INTEGER_FIELDS
        && fields[..PKCS1_INTEGER_FIELDS]
            .iter()
            .all(|f| matches!(f, ASN1Block::Integer(..)));
    if !well_formed {
        return Err(PrivateKeyError::Malformed(FORMAT));
    }
    Ok(KeyAlgorithm::Rsa)
}

/// Checks that `der` is a SEC1 `ECPrivateKey` (RFC 5915).
pub(crate) fn decode_sec1(der: &[u8]) -> Result<KeyAlgorithm, PrivateKeyError> {
    const FORMAT: &str = "SEC1";
    let fields = single_sequence(der, FORMAT)?;

    match fields.as_slice() {
        [ASN1Block::Integer(..), ASN1Block::OctetString(..), ..] => Ok(KeyAlgorithm::Ec),
        _ => Err(PrivateKeyError::Malformed(FORMAT)),
    }
}

fn single_sequence(der: &[u8], format: &'static str) -> Result<Vec<ASN1Block>, PrivateKeyError> {
    let blocks = asn1::from_der(der).map_err(|e| PrivateKeyError::DecodeDer {
        format,
        cause: e.to_string(),
    })?;

    match blocks.into_iter().next() {
        Some(ASN1Block::Sequence(_, fields)) => Ok(fields),
        _ => Err(PrivateKeyError::Malformed(format)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_well_known_oids() {
        assert_eq!(key_algorithm_from_oid(OID_RSA_ENCRYPTION), KeyAlgorithm::Rsa);
        assert_eq!(key_algorithm_from_oid(OID_EC_PUBLIC_KEY), KeyAlgorithm::Ec);
        assert_eq!(key_algorithm_from_oid(OID_ED25519), KeyAlgorithm::Ed25519);
        assert_eq!(
            key_algorithm_from_oid("1.2.3.4"),
            KeyAlgorithm::Other("1.2.3.4".to_string())
        );
    }

    #[test]
    fn rejects_non_der_key_bytes() {
        assert!(matches!(
            decode_pkcs1(b"not der"),
            Err(PrivateKeyError::DecodeDer { format: "PKCS#1", .. })
        ));
        assert!(matches!(
            decode_pkcs8(b"not der"),
            Err(PrivateKeyError::DecodePkcs8(_))
        ));
    }

    #[test]
    fn rejects_certificate_garbage() {
        assert!(parse_der_encoded_bytes_as_x509_certificate(&[0x30, 0x03, 0x02, 0x01, 0x01]).is_err());
    }
}
