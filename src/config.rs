use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::projector::{DEFAULT_FAST_THRESHOLD_MS, Projector};
use crate::sampler::{DEFAULT_INTERVAL, DEFAULT_TIMEOUT, MonitorSettings};

/// Operator preferences remembered between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub target: String,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub fast_threshold_ms: u32,
    /// Overrides `<documents>/pingLog` when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target: "8.8.8.8".to_string(),
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            fast_threshold_ms: DEFAULT_FAST_THRESHOLD_MS,
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                MonitorError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "could not find config directory",
                ))
            })?
            .join("PingLogger");

        fs::create_dir_all(&config_dir)?;
        Ok(config_dir.join("config.json"))
    }

    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        Self::get_config_path()
            .and_then(|path| {
                if path.exists() {
                    Ok(Some(Self::from_json(&fs::read_to_string(&path)?)?))
                } else {
                    Ok(None)
                }
            })
            .unwrap_or_else(|e| {
                log::warn!("Failed to load config, using defaults: {e}");
                None
            })
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::get_config_path()?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Zero durations are replaced by the defaults.
    pub fn settings(&self) -> MonitorSettings {
        let or_default = |ms: u64, default: Duration| {
            if ms == 0 { default } else { Duration::from_millis(ms) }
        };
        MonitorSettings {
            interval: or_default(self.interval_ms, DEFAULT_INTERVAL),
            timeout: or_default(self.timeout_ms, DEFAULT_TIMEOUT),
            projector: Projector::default().with_fast_threshold(self.fast_threshold_ms),
        }
    }
}
