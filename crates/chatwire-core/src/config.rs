//! Configuration loading and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level Chatwire configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub calls: Option<CallsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: None,
        }
    }
}

fn default_port() -> u16 {
    8080
}

/// Pending incoming-call retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsConfig {
    /// Seconds a call handle stays available for `reject_call`.
    #[serde(default = "default_call_ttl")]
    pub ttl_secs: u64,

    /// Seconds between expired-entry sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_call_ttl() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory for the JSONL event store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Config {
    /// Load config from a JSON5 file. A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::ChatwireError::Io)?;
        let config: Config = json5::from_str(&raw)
            .map_err(|e| crate::error::ChatwireError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Default config file location: `~/.chatwire/config.json`
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn gateway_port(&self) -> u16 {
        self.gateway.as_ref().map(|g| g.port).unwrap_or(8080)
    }

    pub fn gateway_bind(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    pub fn call_ttl(&self) -> std::time::Duration {
        let secs = self.calls.as_ref().map(|c| c.ttl_secs).unwrap_or(60);
        std::time::Duration::from_secs(secs)
    }

    pub fn call_sweep_interval(&self) -> std::time::Duration {
        let secs = self
            .calls
            .as_ref()
            .map(|c| c.sweep_interval_secs)
            .unwrap_or(30);
        std::time::Duration::from_secs(secs)
    }

    /// Directory for the JSONL event store.
    pub fn store_dir(&self) -> PathBuf {
        self.store
            .as_ref()
            .and_then(|s| s.dir.as_ref())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("store"))
    }
}

/// Base directory for Chatwire data: `~/.chatwire/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chatwire")
}
