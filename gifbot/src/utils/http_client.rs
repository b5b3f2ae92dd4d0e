use std::sync::OnceLock;

use tracing::debug;

/// Install the aws-lc-rs provider as the process-wide rustls default.
///
/// reqwest is built without a bundled provider, so this must run before the
/// first client is created.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        install_rustls_provider();
        install_rustls_provider();
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }
}
