//! Dev server listen and metrics configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen_port")]
    pub port: u16,
    /// Directory served as static files when a request passes through
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            port: default_listen_port(),
            root: default_root(),
        }
    }
}

fn default_listen_port() -> u16 {
    8000
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}
