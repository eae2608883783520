use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScraperConfig {
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Timeouts for one scrape, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,
    #[serde(default = "default_interaction_ms")]
    pub show_more_ms: u64,
    #[serde(default = "default_interaction_ms")]
    pub expansion_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Upper bound for polling the review count after the fixed delay. 0 disables polling.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    #[serde(default = "default_settle_poll_ms")]
    pub settle_poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserSettings {
    /// Chromium binary; located automatically when unset
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Download Chromium with the fetcher when no system install is found
    #[serde(default = "default_true")]
    pub fetch_if_missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeouts.navigation_ms must be greater than zero")]
    ZeroNavigationTimeout,
    #[error("timeouts.settle_poll_ms must be greater than zero when settle polling is enabled")]
    ZeroPollInterval,
    #[error("batch.concurrency must be at least 1")]
    ZeroConcurrency,
}

fn default_navigation_ms() -> u64 {
    60_000
}

fn default_interaction_ms() -> u64 {
    5_000
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_settle_timeout_ms() -> u64 {
    3_000
}

fn default_settle_poll_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    2
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            show_more_ms: default_interaction_ms(),
            expansion_ms: default_interaction_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
            settle_poll_ms: default_settle_poll_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn show_more(&self) -> Duration {
        Duration::from_millis(self.show_more_ms)
    }

    pub fn expansion(&self) -> Duration {
        Duration::from_millis(self.expansion_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn settle_poll(&self) -> Duration {
        Duration::from_millis(self.settle_poll_ms)
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            extra_args: Vec::new(),
            fetch_if_missing: true,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl ScraperConfig {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScraperConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.navigation_ms == 0 {
            return Err(ConfigError::ZeroNavigationTimeout);
        }
        if self.timeouts.settle_timeout_ms > 0 && self.timeouts.settle_poll_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.batch.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}
