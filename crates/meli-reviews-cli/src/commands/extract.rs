use crate::output::{print_reports, Output, PageReport, ReviewFormat};
use clap::Args;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Saved HTML document
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Review listing format
    #[arg(long, default_value = "table", value_enum)]
    pub format: ReviewFormat,
}

pub async fn run_extract(args: ExtractArgs, output: &Output) -> Result<()> {
    let markup = tokio::fs::read_to_string(&args.file)
        .await
        .wrap_err_with(|| format!("Failed to read {}", args.file.display()))?;

    let label = args.file.display().to_string();
    let reviews = meli_reviews_core::extract(&markup).map_err(|e| eyre!("{}: {}", label, e))?;
    let count = reviews.len();

    print_reports(args.format, &[PageReport::ok(label, reviews)])
        .map_err(|e| eyre!("Failed to write reviews: {}", e))?;
    output.success(format!("Extracted {} unique review(s)", count));
    Ok(())
}
