//! Forwarding configuration: proxy mode, remote target, rewrite rules and mocks.

use super::pool::ConnectionPoolConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which destination unmatched requests are sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProxyMode {
    /// Every request goes to the next handler untouched.
    Disabled = 0,
    /// Requests matching the mock pattern are served from `mock_dir`.
    Mock = 1,
    /// Requests are rewritten locally by rule or forwarded to the remote server.
    Remote = 2,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Disabled => "disabled",
            ProxyMode::Mock => "mock",
            ProxyMode::Remote => "remote",
        }
    }
}

impl TryFrom<u8> for ProxyMode {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProxyMode::Disabled),
            1 => Ok(ProxyMode::Mock),
            2 => Ok(ProxyMode::Remote),
            other => Err(ConfigError::UnknownMode(other)),
        }
    }
}

/// Forwarding middleware configuration as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForwardConfig {
    /// 0 = disabled, 1 = mock, 2 = remote
    #[serde(default)]
    pub proxy_mode: u8,
    /// Remote server origin including scheme, e.g. `http://10.0.0.1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<RemotePort>,
    /// Local rewrite rules for remote mode; first match wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_config: Option<MockConfig>,
    /// Give up on the remote server after this many seconds (no limit when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Skip TLS certificate verification for an https remote (self-signed dev backends)
    #[serde(default)]
    pub tls_skip_verify: bool,
    /// Pass the client's `Host` header to the remote server unchanged. When
    /// false the remote sees its own host.
    #[serde(default = "default_preserve_host")]
    pub preserve_host: bool,
    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        ForwardConfig {
            proxy_mode: 0,
            remote_host: None,
            remote_port: None,
            rules: Vec::new(),
            mock_config: None,
            timeout_secs: None,
            tls_skip_verify: false,
            preserve_host: default_preserve_host(),
            connection_pool: ConnectionPoolConfig::default(),
        }
    }
}

fn default_preserve_host() -> bool {
    true
}

/// A URL rewrite rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Regular expression tested anywhere in the request url
    pub pattern: String,
    /// Replacement template (`$1`, `$&`, `$<name>`, `` $` ``, `$'`, `$$`)
    pub replace: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MockConfig {
    /// Directory the request path is appended to
    pub mock_dir: PathBuf,
    /// Requests whose path matches this pattern are served from `mock_dir`
    pub mock_pattern: String,
}

/// Remote port, written either as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RemotePort {
    Number(u16),
    Text(String),
}

impl RemotePort {
    pub fn to_port(&self) -> Result<u16, ConfigError> {
        match self {
            RemotePort::Number(port) => Ok(*port),
            RemotePort::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidRemotePort(text.clone())),
        }
    }
}

impl From<u16> for RemotePort {
    fn from(port: u16) -> Self {
        RemotePort::Number(port)
    }
}

impl ForwardConfig {
    pub fn mode(&self) -> Result<ProxyMode, ConfigError> {
        ProxyMode::try_from(self.proxy_mode)
    }

    /// Check that the fields the selected mode needs are present.
    pub fn validate(&self) -> Result<ProxyMode, ConfigError> {
        let mode = self.mode()?;
        match mode {
            ProxyMode::Disabled => {}
            ProxyMode::Mock => {
                if self.mock_config.is_none() {
                    return Err(ConfigError::MissingMockConfig);
                }
            }
            ProxyMode::Remote => {
                self.remote_origin()?;
            }
        }
        Ok(mode)
    }

    /// `{remote_host}:{remote_port}`, the prefix every forwarded url is appended to.
    pub fn remote_origin(&self) -> Result<String, ConfigError> {
        let host = self
            .remote_host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or(ConfigError::MissingRemoteHost)?;
        let port = self
            .remote_port
            .as_ref()
            .ok_or(ConfigError::MissingRemotePort)?
            .to_port()?;
        Ok(format!("{host}:{port}"))
    }
}
