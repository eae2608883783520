use clap::{ArgAction, Parser, Subcommand};
use commands::{config, extract, scrape};
use meli_reviews_config::PathManager;
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "meli-reviews")]
#[command(about = "Scrape product reviews from Mercado Libre pages")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Status message format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr (rotated daily)
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Write logs to the default log file in the application log directory
    #[arg(long, global = true, conflicts_with = "log_file")]
    log_to_file: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| self.log_to_file.then(|| PathManager::default().log_file()))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render product pages in headless Chromium and extract their reviews
    #[command(long_about = "Open each product page in a fresh headless browser, expand the full review list when the page offers a 'show all reviews' control, and print the unique reviews found. Several URLs are scraped concurrently.")]
    Scrape(scrape::ScrapeArgs),

    /// Extract reviews from a saved HTML document
    #[command(long_about = "Run the review extractor on markup saved to disk, for example a page.html captured with BROWSER_DEBUG=1. No browser is started.")]
    Extract(extract::ExtractArgs),

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging_with_file(cli.verbose, cli.quiet, cli.log_file_path())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let config_path = cli.config.clone();

    match cli.command {
        Commands::Scrape(args) => scrape::run_scrape(args, config_path, &output).await,
        Commands::Extract(args) => extract::run_extract(args, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, config_path, &output).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_to_file_uses_default_log_path() {
        let cli = Cli::parse_from(["meli-reviews", "--log-to-file", "config", "path"]);
        assert_eq!(cli.log_file_path(), Some(PathManager::default().log_file()));
    }

    #[test]
    fn test_explicit_log_file_wins_and_conflicts_with_default() {
        let cli = Cli::parse_from(["meli-reviews", "--log-file", "/tmp/x.log", "config", "path"]);
        assert_eq!(cli.log_file_path(), Some(PathBuf::from("/tmp/x.log")));

        let both = Cli::try_parse_from(["meli-reviews", "--log-file", "/tmp/x.log", "--log-to-file", "config", "path"]);
        assert!(both.is_err());

        let neither = Cli::parse_from(["meli-reviews", "config", "path"]);
        assert_eq!(neither.log_file_path(), None);
    }
}
