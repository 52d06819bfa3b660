//! Listener setup

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;
use crate::error::AppError;

/// Read the PEM certificate chain and private key for HTTPS
///
/// # Errors
/// Returns `AppError::Config` naming the files if either cannot be read
/// or parsed
pub async fn load_tls(tls: &TlsConfig) -> Result<RustlsConfig, AppError> {
    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| {
            AppError::Config(format!(
                "failed to load TLS certificate {} / key {}: {e}",
                tls.cert_path.display(),
                tls.key_path.display()
            ))
        })
}
