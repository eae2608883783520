use crate::config::DebugConfig;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Step-by-step record of one page render.
///
/// Steps are always recorded in memory. Files (a `summary.json` and, if enabled,
/// the captured `page.html`) are only written when the config is enabled; write
/// failures are logged and never reach the caller.
pub struct RenderTrace {
    operation: String,
    capture_html: bool,
    trace_dir: Option<PathBuf>,
    current_step: Option<Step>,
    steps: Vec<StepRecord>,
}

struct Step {
    name: String,
    started: Instant,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepRecord {
    pub step_number: usize,
    pub name: String,
    pub success: bool,
    pub detail: Option<String>,
    pub elapsed_ms: u128,
}

impl RenderTrace {
    pub fn start(config: &DebugConfig, operation: &str) -> Self {
        let trace_dir = if config.is_enabled() {
            let dir = config.output_dir().join(format!(
                "{}_{}",
                Utc::now().format("%Y%m%dT%H%M%S%.6f"),
                sanitize_label(operation)
            ));
            match std::fs::create_dir_all(&dir) {
                Ok(()) => {
                    info!(trace_dir = ?dir, "Browser debug tracing enabled");
                    Some(dir)
                }
                Err(e) => {
                    warn!("Failed to create trace directory {:?}: {}", dir, e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            operation: operation.to_string(),
            capture_html: config.capture_html,
            trace_dir,
            current_step: None,
            steps: Vec::new(),
        }
    }

    pub fn start_step(&mut self, name: &str) {
        // An unfinished step is closed as failed before the next one begins
        if self.current_step.is_some() {
            self.end_step(false, Some("superseded by next step".to_string()));
        }
        debug!(step = name, "Render step started");
        self.current_step = Some(Step {
            name: name.to_string(),
            started: Instant::now(),
        });
    }

    pub fn end_step(&mut self, success: bool, detail: Option<String>) {
        if let Some(step) = self.current_step.take() {
            let elapsed_ms = step.started.elapsed().as_millis();
            debug!(step = %step.name, success, elapsed_ms = elapsed_ms as u64, "Render step finished");
            self.steps.push(StepRecord {
                step_number: self.steps.len() + 1,
                name: step.name,
                success,
                detail,
                elapsed_ms,
            });
        }
    }

    /// Save the captured document next to the summary
    pub fn save_markup(&self, html: &str) -> Option<PathBuf> {
        if !self.capture_html {
            return None;
        }
        let dir = self.trace_dir.as_ref()?;
        let path = dir.join("page.html");
        match std::fs::write(&path, html) {
            Ok(()) => {
                info!("Page HTML saved: {:?}", path);
                Some(path)
            }
            Err(e) => {
                warn!("Failed to write HTML to {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn summary(&self) -> Value {
        json!({
            "operation": self.operation,
            "total_steps": self.steps.len(),
            "successful_steps": self.steps.iter().filter(|s| s.success).count(),
            "failed_steps": self.steps.iter().filter(|s| !s.success).count(),
            "steps": self.steps,
        })
    }

    /// Close any open step and write `summary.json`
    pub fn finish(mut self) -> Option<PathBuf> {
        if self.current_step.is_some() {
            self.end_step(false, Some("render aborted".to_string()));
        }
        let dir = self.trace_dir.clone()?;
        match self.write_summary(&dir) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to write trace summary: {:#}", e);
                None
            }
        }
    }

    fn write_summary(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join("summary.json");
        let content = serde_json::to_string_pretty(&self.summary())?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write summary to {:?}", path))?;
        Ok(path)
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    // Keep directory names well under filesystem limits
    cleaned.chars().take(80).collect()
}
