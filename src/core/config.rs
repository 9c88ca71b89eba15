use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::telemetry::{
    resolve_binary, AlertSettings, PowerSettings, SamplerConfig, SeverityThresholds,
};

const DEFAULT_BINARY: &str = "nvidia-smi";
const MIN_REFRESH_MS: u64 = 500;
const MAX_REFRESH_MS: u64 = 60_000;

/// Sampling cadence and subprocess tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub refresh_interval_ms: u64,
    pub backoff_ceiling_secs: u64,
    pub query_timeout_secs: u64,
    /// Override for the vendor utility; a bare name is resolved on PATH
    pub binary: Option<String>,
    pub history_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 2000,
            backoff_ceiling_secs: 30,
            query_timeout_secs: 5,
            binary: None,
            history_capacity: 300,
        }
    }
}

/// Persisted settings, loaded from `<config dir>/gpumon/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub thresholds: SeverityThresholds,
    #[serde(default)]
    pub power: PowerSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        let mut config = if !path.exists() {
            Config::default()
        } else {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            if data.trim().is_empty() {
                Config::default()
            } else {
                serde_json::from_str(&data).unwrap_or_else(|err| {
                    // A corrupt or outdated file falls back to defaults
                    // instead of blocking startup.
                    log::warn!("ignoring unreadable config {}: {}", path.display(), err);
                    Config::default()
                })
            }
        };

        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }

        let data = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, data)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("gpumon").join("config.json"))
    }

    /// Clamp persisted values into their supported ranges.
    pub(crate) fn normalize(&mut self) {
        self.monitor.refresh_interval_ms = self
            .monitor
            .refresh_interval_ms
            .clamp(MIN_REFRESH_MS, MAX_REFRESH_MS);
        if self.monitor.history_capacity == 0 {
            self.monitor.history_capacity = MonitorSettings::default().history_capacity;
        }
    }

    pub fn binary_name(&self) -> &str {
        self.monitor.binary.as_deref().unwrap_or(DEFAULT_BINARY)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.refresh_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.monitor.query_timeout_secs)
    }

    /// Resolve the vendor utility and assemble the sampler configuration.
    pub fn sampler_config(&self) -> Result<SamplerConfig> {
        let binary = resolve_binary(self.binary_name())?;
        Ok(SamplerConfig {
            binary,
            interval: self.refresh_interval(),
            backoff_ceiling: Duration::from_secs(self.monitor.backoff_ceiling_secs),
            query_timeout: self.query_timeout(),
        })
    }
}
