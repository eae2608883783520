pub mod config;
pub mod paths;

pub use config::{BatchConfig, BrowserSettings, ConfigError, ScraperConfig, TimeoutConfig};
pub use paths::{PathManager, container_base_path};
