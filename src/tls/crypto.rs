//! rustls crypto provider selection.

use rustls::crypto::CryptoProvider;
use std::sync::{Arc, OnceLock};

/// Provider used for key operations: the process default when the application
/// installed one, otherwise the one selected by this crate's features.
pub(crate) fn active_provider() -> Arc<CryptoProvider> {
    if let Some(installed) = CryptoProvider::get_default() {
        return Arc::clone(installed);
    }
    static BUNDLED: OnceLock<Arc<CryptoProvider>> = OnceLock::new();
    Arc::clone(BUNDLED.get_or_init(|| Arc::new(bundled())))
}

/// Makes the feature-selected provider the process default if none is set.
pub(crate) fn install_bundled_provider() {
    if CryptoProvider::get_default().is_none() {
        // Another thread may install first; its provider then stays.
        let _ = bundled().install_default();
    }
}

#[cfg(feature = "ring")]
fn bundled() -> CryptoProvider {
    rustls::crypto::ring::default_provider()
}

#[cfg(feature = "aws-lc-rs")]
fn bundled() -> CryptoProvider {
    rustls::crypto::aws_lc_rs::default_provider()
}
