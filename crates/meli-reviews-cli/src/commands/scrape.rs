use super::config::load_config;
use super::progress::ScrapeProgress;
use crate::output::{print_reports, Output, PageReport, ReviewFormat};
use browser_debug::DebugConfig;
use clap::{ArgAction, Args};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use meli_reviews_config::{PathManager, ScraperConfig};
use meli_reviews_core::{ChromiumEngine, RenderOptions, Renderer, Scraper};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Product page URL(s)
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Maximum time for the page navigation, in milliseconds
    #[arg(long, value_name = "MS")]
    pub navigation_timeout: Option<u64>,

    /// How long to look for the "show all reviews" control, in milliseconds
    #[arg(long, value_name = "MS")]
    pub show_more_timeout: Option<u64>,

    /// How long to wait for the expanded review list, in milliseconds
    #[arg(long, value_name = "MS")]
    pub expansion_timeout: Option<u64>,

    /// Fixed wait before capturing the page, in milliseconds
    #[arg(long, value_name = "MS")]
    pub settle_delay: Option<u64>,

    /// Abandon the whole run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Number of pages scraped at the same time
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Review listing format
    #[arg(long, default_value = "table", value_enum)]
    pub format: ReviewFormat,

    /// Show the browser window instead of running headless
    #[arg(long, action = ArgAction::SetTrue)]
    pub headed: bool,

    /// Save per-step traces and the rendered HTML under this directory
    #[arg(long, value_name = "DIR")]
    pub debug_dir: Option<PathBuf>,
}

impl ScrapeArgs {
    /// Command-line flags take precedence over the file
    fn apply_overrides(&self, config: &mut ScraperConfig) {
        if let Some(ms) = self.navigation_timeout {
            config.timeouts.navigation_ms = ms;
        }
        if let Some(ms) = self.show_more_timeout {
            config.timeouts.show_more_ms = ms;
        }
        if let Some(ms) = self.expansion_timeout {
            config.timeouts.expansion_ms = ms;
        }
        if let Some(ms) = self.settle_delay {
            config.timeouts.settle_delay_ms = ms;
        }
        if let Some(n) = self.concurrency {
            config.batch.concurrency = n;
        }
        if self.headed {
            config.browser.headless = false;
        }
    }

    fn debug_config(&self) -> Result<DebugConfig> {
        match &self.debug_dir {
            Some(dir) => DebugConfig::new(dir).map_err(|e| eyre!("{:#}", e)),
            None => {
                let mut config = DebugConfig::from_env();
                if config.is_enabled() && std::env::var_os("BROWSER_DEBUG_DIR").is_none() {
                    config.output_dir = PathManager::default().debug_dir();
                }
                Ok(config)
            }
        }
    }
}

pub async fn run_scrape(args: ScrapeArgs, config_path: Option<PathBuf>, output: &Output) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;
    args.apply_overrides(&mut config);
    config.validate().map_err(|e| eyre!("Invalid configuration: {}", e))?;

    let options = RenderOptions::from(&config.timeouts);
    let engine = ChromiumEngine::new(config.browser.clone(), options.navigation_timeout)
        .await
        .map_err(|e| eyre!("{}", e))?;
    tracing::debug!(executable = ?engine.executable(), "Browser engine ready");

    let debug = args.debug_config()?;
    if debug.is_enabled() {
        output.info(format!("Writing render traces to {}", debug.output_dir().display()));
    }
    let scraper = Scraper::new(Renderer::with_debug(Arc::new(engine), debug), options);

    let progress = ScrapeProgress::new(args.urls.len(), output.is_quiet());
    let run = scraper.scrape_many(&args.urls, config.batch.concurrency);
    let results = match args.deadline {
        // Dropping the in-flight scrapes kills their browsers
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
            Ok(results) => results,
            Err(_) => {
                progress.finish("deadline exceeded");
                return Err(eyre!("Deadline of {}s exceeded before all pages were scraped", secs));
            }
        },
        None => run.await,
    };
    progress.finish("done");

    let reports: Vec<PageReport> = args
        .urls
        .iter()
        .zip(results)
        .map(|(url, result)| match result {
            Ok(reviews) => PageReport::ok(url, reviews),
            Err(e) => PageReport::failed(url, e),
        })
        .collect();

    print_reports(args.format, &reports).map_err(|e| eyre!("Failed to write reviews: {}", e))?;

    let failures: Vec<&PageReport> = reports.iter().filter(|r| r.is_failure()).collect();
    for report in &failures {
        output.error(format!("{}: {}", report.url, report.error.as_deref().unwrap_or_default()));
    }

    let total_reviews: usize = reports.iter().filter_map(|r| r.reviews.as_ref()).map(Vec::len).sum();
    if failures.is_empty() {
        output.success(format!("Scraped {} unique review(s) from {} page(s)", total_reviews, reports.len()));
        Ok(())
    } else {
        Err(eyre!("{} of {} page(s) failed", failures.len(), reports.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ScrapeArgs,
    }

    #[test]
    fn test_flags_override_config() {
        let cli = TestCli::parse_from([
            "test",
            "https://a.example.com",
            "https://b.example.com",
            "--navigation-timeout",
            "30000",
            "--settle-delay",
            "2500",
            "--concurrency",
            "4",
            "--headed",
        ]);
        let mut config = ScraperConfig::default();
        cli.args.apply_overrides(&mut config);

        assert_eq!(cli.args.urls.len(), 2);
        assert_eq!(config.timeouts.navigation_ms, 30_000);
        assert_eq!(config.timeouts.settle_delay_ms, 2_500);
        assert_eq!(config.timeouts.show_more_ms, 5_000);
        assert_eq!(config.batch.concurrency, 4);
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_url_is_required() {
        assert!(TestCli::try_parse_from(["test"]).is_err());
    }
}
