//! Connection pool settings for the shared remote client.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionPoolConfig {
    /// Idle connections kept per remote host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
    /// Seconds an idle pooled connection is kept
    #[serde(default = "default_idle_secs")]
    pub idle_timeout_secs: u64,
    /// TCP keepalive interval in seconds
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_timeout_secs: u64,
    #[serde(default = "default_connect_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        ConnectionPoolConfig {
            max_idle_per_host: default_max_idle(),
            idle_timeout_secs: default_idle_secs(),
            keepalive_timeout_secs: default_keepalive_secs(),
            connect_timeout_secs: default_connect_secs(),
        }
    }
}

fn default_max_idle() -> usize {
    32
}

fn default_idle_secs() -> u64 {
    90
}

fn default_keepalive_secs() -> u64 {
    60
}

fn default_connect_secs() -> u64 {
    5
}
