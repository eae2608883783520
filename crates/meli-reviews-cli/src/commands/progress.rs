use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Spinner on interactive terminals, structured log lines otherwise.
pub struct ScrapeProgress {
    spinner: Option<ProgressBar>,
}

impl ScrapeProgress {
    pub fn new(total: usize, quiet: bool) -> Self {
        if quiet || !is_interactive() {
            tracing::info!(operation = "scrape", pages = total, "Scraping {} page(s)", total);
            return Self { spinner: None };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!("Scraping {} page(s)...", total));
        Self { spinner: Some(spinner) }
    }

    pub fn finish(&self, message: &str) {
        match &self.spinner {
            Some(spinner) => spinner.finish_and_clear(),
            None => tracing::info!(operation = "scrape", message, "Scrape finished"),
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
