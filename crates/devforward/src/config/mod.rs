//! Configuration types for devforward.

mod forward;
mod listen;
mod pool;

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use forward::{ForwardConfig, MockConfig, ProxyMode, RemotePort, RuleConfig};
pub use listen::{ListenConfig, MetricsConfig};
pub use pool::ConnectionPoolConfig;

/// Dev server configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    /// Metrics listener; disabled when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub forward: ForwardConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(ref metrics) = self.metrics {
            if metrics.port == self.listen.port {
                anyhow::bail!(
                    "metrics.port and listen.port must differ (both are {})",
                    metrics.port
                );
            }
        }

        self.forward.validate()?;
        Ok(())
    }
}
