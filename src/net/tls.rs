//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::schema::TlsConfig;

/// Load TLS state from the configured certificate and key files.
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);

    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    let config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    tracing::info!(cert = %tls.cert_path, "TLS configuration loaded");
    Ok(config)
}
