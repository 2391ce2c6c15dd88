//! Error types for devforward.

use std::time::Duration;

/// Invalid forwarding configuration. Raised while installing the middleware,
/// before any request is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown proxy_mode {0} (expected 0 = disabled, 1 = mock, 2 = remote)")]
    UnknownMode(u8),
    #[error("proxy_mode 2 (remote) requires 'remote_host'")]
    MissingRemoteHost,
    #[error("proxy_mode 2 (remote) requires 'remote_port'")]
    MissingRemotePort,
    #[error("Invalid remote_port '{0}'")]
    InvalidRemotePort(String),
    #[error("proxy_mode 1 (mock) requires 'mock_config'")]
    MissingMockConfig,
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Failed to set up HTTP client: {0}")]
    Client(#[source] std::io::Error),
}

/// Failure while forwarding a request to the remote server.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Invalid target url '{target}': {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },
    #[error("{0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("Upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// `err` followed by each of its sources, separated by `: `.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
