use crate::cert::error::PrivateKeyError;
use crate::cert::{Certificate, KeyFormat, PrivateKey};
use crate::error::{ParseError, ParseErrorKind};
use crate::pem::PemBundle;
use crate::prelude::debug;
use x509_parser::pem::Pem;

enum BlockKind {
    Certificate,
    Key(KeyFormat),
    EncryptedKey,
}

fn classify(label: &str) -> Option<BlockKind> {
    match label {
        "CERTIFICATE" | "X509 CERTIFICATE" => Some(BlockKind::Certificate),
        "PRIVATE KEY" => Some(BlockKind::Key(KeyFormat::Pkcs8)),
        "RSA PRIVATE KEY" => Some(BlockKind::Key(KeyFormat::Pkcs1)),
        "EC PRIVATE KEY" => Some(BlockKind::Key(KeyFormat::Sec1)),
        "ENCRYPTED PRIVATE KEY" => Some(BlockKind::EncryptedKey),
        _ => None,
    }
}

/// Decodes a stream of concatenated PEM blocks into a [`PemBundle`].
///
/// Certificates are appended to the chain in stream order. The first private
/// key block is kept; later key blocks are ignored. A stream without any block
/// yields an empty bundle.
///
/// # Errors
///
/// Returns [`ParseError`] with the zero-based block index if a block has
/// malformed armor or base64, an unrecognized label, an undecodable
/// certificate, or a key that no supported encoding accepts.
pub fn parse_bundle(input: &[u8]) -> Result<PemBundle, ParseError> {
    let mut chain = Vec::new();
    let mut key: Option<PrivateKey> = None;

    for (block, item) in Pem::iter_from_buffer(input).enumerate() {
        let pem = item.map_err(|e| ParseError::new(block, ParseErrorKind::Pem(e.to_string())))?;

        match classify(&pem.label) {
            Some(BlockKind::Certificate) => {
                let cert =
                    Certificate::try_from(pem.contents).map_err(|e| ParseError::new(block, e))?;
                chain.push(cert);
            }
            Some(BlockKind::Key(_) | BlockKind::EncryptedKey) if key.is_some() => {
                debug!("Ignoring additional private key block: block={block}");
            }
            Some(BlockKind::Key(format)) => {
                let decoded =
                    PrivateKey::from_der(pem.contents, format).map_err(|e| ParseError::new(block, e))?;
                key = Some(decoded);
            }
            Some(BlockKind::EncryptedKey) => {
                return Err(ParseError::new(block, PrivateKeyError::Encrypted));
            }
            None => {
                return Err(ParseError::new(
                    block,
                    ParseErrorKind::UnknownLabel(pem.label),
                ));
            }
        }
    }

    // Stamped after the last block so the timestamp reflects parse completion.
    Ok(PemBundle::new(chain, key))
}
