use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use meli_reviews_config::{PathManager, ScraperConfig};
use serde_json::json;
use std::path::{Path, PathBuf};

pub async fn run_config(cmd: ConfigCommands, config_path: Option<PathBuf>, output: &Output) -> Result<()> {
    let path = resolve_path(config_path.as_ref());
    match cmd {
        ConfigCommands::Show => show_config(&path, output),
        ConfigCommands::Init { force } => init_config(&path, force, output),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn resolve_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(|| PathManager::default().config_file())
}

/// Load the file at `config_path` (or the default location), falling back to defaults if absent
pub fn load_config(config_path: Option<&PathBuf>) -> Result<ScraperConfig> {
    let path = resolve_path(config_path);
    let config = ScraperConfig::load_or_default(&path)
        .map_err(|e| eyre!("Failed to load config from {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), exists = path.exists(), "Loaded configuration");
    Ok(config)
}

fn show_config(path: &Path, output: &Output) -> Result<()> {
    let config = load_config(Some(&path.to_path_buf()))?;
    if !path.exists() {
        output.warn(format!("Configuration file not found at {}, showing defaults", path.display()));
    }

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }
            let mut table = Table::new();
            table
                .load_preset(comfy_table::presets::UTF8_FULL)
                .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").add_attribute(comfy_table::Attribute::Bold),
                    Cell::new("Value").add_attribute(comfy_table::Attribute::Bold),
                ]);

            let t = &config.timeouts;
            let rows: Vec<(&str, String)> = vec![
                ("Config file", path.display().to_string()),
                ("Log file (--log-to-file)", PathManager::default().log_file().display().to_string()),
                ("Navigation timeout", format!("{} ms", t.navigation_ms)),
                ("Show-more timeout", format!("{} ms", t.show_more_ms)),
                ("Expansion timeout", format!("{} ms", t.expansion_ms)),
                ("Settle delay", format!("{} ms", t.settle_delay_ms)),
                ("Settle polling", format!("{} ms every {} ms", t.settle_timeout_ms, t.settle_poll_ms)),
                (
                    "Chromium",
                    config
                        .browser
                        .executable
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "auto-detect".to_string()),
                ),
                ("Headless", config.browser.headless.to_string()),
                ("Download if missing", config.browser.fetch_if_missing.to_string()),
                ("Extra arguments", config.browser.extra_args.join(" ")),
                ("Concurrency", config.batch.concurrency.to_string()),
            ];
            for (name, value) in rows {
                table.add_row(vec![Cell::new(name), Cell::new(value)]);
            }
            println!("{}", table);
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let value = json!({
                "path": path.display().to_string(),
                "log_file": PathManager::default().log_file().display().to_string(),
                "config": config,
            });
            let text = if output.format() == OutputFormat::JsonPretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            println!("{}", text);
        }
    }
    Ok(())
}

fn config_path_is_default(path: &Path) -> bool {
    path == PathManager::default().config_file()
}

fn init_config(path: &Path, force: bool, output: &Output) -> Result<()> {
    if config_path_is_default(path) {
        PathManager::default()
            .ensure_directories()
            .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;
    }
    if path.exists() && !force {
        output.warn(format!("Configuration already exists at {} (use --force to overwrite)", path.display()));
        return Ok(());
    }
    ScraperConfig::default()
        .save_to_file(path)
        .map_err(|e| eyre!("Failed to write config to {}: {}", path.display(), e))?;
    output.success(format!("Wrote default configuration to {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let output = Output::new(OutputFormat::Human, true);

        init_config(&path, false, &output).unwrap();
        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, ScraperConfig::default());
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[batch]\nconcurrency = 7\n").unwrap();
        let output = Output::new(OutputFormat::Human, true);

        init_config(&path, false, &output).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().batch.concurrency, 7);

        init_config(&path, true, &output).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().batch.concurrency, 2);
    }
}
