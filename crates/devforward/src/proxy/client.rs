//! HTTP client creation and configuration.
//!
//! One client is created per installed middleware and shared by every
//! forwarded request.

use super::response_ext::ForwardBody;
use super::tls::NoVerifier;
use crate::config::ConnectionPoolConfig;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Type alias for the HTTP client used to reach the remote server.
pub type HttpClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, ForwardBody>;

/// How the client authenticates an https remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteTls {
    /// Plain http remote; no trust roots are loaded.
    Plain,
    /// Verify against the platform's native roots.
    Verified,
    /// Accept any certificate.
    SkipVerify,
}

impl RemoteTls {
    pub fn for_origin(origin: &str, skip_verify: bool) -> Self {
        let is_https = origin
            .get(..8)
            .map(|scheme| scheme.eq_ignore_ascii_case("https://"))
            .unwrap_or(false);
        match (is_https, skip_verify) {
            (false, _) => RemoteTls::Plain,
            (true, false) => RemoteTls::Verified,
            (true, true) => RemoteTls::SkipVerify,
        }
    }
}

/// Create the shared HTTP client with connection pooling.
///
/// # Arguments
/// * `pool` - Connection pool settings
/// * `tls` - Certificate handling for the remote
pub fn create_http_client(
    pool: &ConnectionPoolConfig,
    tls: RemoteTls,
) -> Result<HttpClient, std::io::Error> {
    let mut http_connector = HttpConnector::new();
    http_connector.set_keepalive(Some(Duration::from_secs(pool.keepalive_timeout_secs)));
    http_connector.set_connect_timeout(Some(Duration::from_secs(pool.connect_timeout_secs)));
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS

    let https_connector = match tls {
        RemoteTls::Plain => hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(
                rustls::ClientConfig::builder()
                    .with_root_certificates(rustls::RootCertStore::empty())
                    .with_no_client_auth(),
            )
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector),
        RemoteTls::Verified => hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector),
        RemoteTls::SkipVerify => {
            warn!("TLS certificate verification DISABLED for the remote server (development only)");
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_tls_config(
                    rustls::ClientConfig::builder()
                        .dangerous()
                        .with_custom_certificate_verifier(Arc::new(NoVerifier))
                        .with_no_client_auth(),
                )
                .https_or_http()
                .enable_http1()
                .wrap_connector(http_connector)
        }
    };

    let http_client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
        .pool_max_idle_per_host(pool.max_idle_per_host)
        .build(https_connector);

    debug!(
        "Connection pool configured (HTTP/1.1, {:?}): max_idle={}, idle_timeout={}s, keepalive={}s",
        tls, pool.max_idle_per_host, pool.idle_timeout_secs, pool.keepalive_timeout_secs
    );

    Ok(http_client)
}
