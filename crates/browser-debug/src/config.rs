use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Write the captured markup next to the step summary
    #[serde(default = "default_true")]
    pub capture_html: bool,
}

fn default_enabled() -> bool {
    env::var("BROWSER_DEBUG").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn default_output_dir() -> PathBuf {
    env::var("BROWSER_DEBUG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./browser_debug"))
}

fn default_true() -> bool {
    true
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            output_dir: default_output_dir(),
            capture_html: true,
        }
    }
}

impl DebugConfig {
    /// Create a new DebugConfig from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Tracing switched off regardless of the environment
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Create an enabled DebugConfig writing into `output_dir`
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create debug output directory: {:?}", output_dir))?;

        Ok(Self {
            enabled: true,
            output_dir,
            capture_html: true,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
