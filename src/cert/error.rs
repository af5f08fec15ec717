//! Error types for certificate and private key decoding.

use x509_parser::error::X509Error;

/// An error that may arise parsing X.509 certificates.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    /// Error returned by the X.509 parsing library.
    #[error("failed parsing X.509 certificate: {0}")]
    ParseX509Certificate(#[from] X509Error),

    /// The block decoded to a certificate followed by extra bytes.
    #[error("unexpected {0} trailing byte(s) after X.509 certificate")]
    TrailingBytes(usize),
}

/// An error that may arise decoding private keys.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum PrivateKeyError {
    /// Error returned by the PKCS#8 private key decoding library.
    #[error("failed decoding PKCS#8 private key: {0}")]
    DecodePkcs8(pkcs8::Error),

    /// The key bytes are not valid DER.
    #[error("failed decoding {format} private key: {cause}")]
    DecodeDer {
        /// Encoding the bytes were expected to be in.
        format: &'static str,
        /// Decoder message.
        cause: String,
    },

    /// The DER structure does not have the shape of the declared encoding.
    #[error("malformed {0} private key structure")]
    Malformed(&'static str),

    /// The key is password protected; decryption is not supported.
    #[error("encrypted private keys are not supported")]
    Encrypted,
}
