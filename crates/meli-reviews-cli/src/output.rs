use clap::ValueEnum;
use comfy_table::{Cell, ContentArrangement, Table};
use meli_reviews_models::Review;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;
use std::io::{self, IsTerminal, Write};

/// Format of status messages (success/info/warn/error lines)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

/// Format of the review listing written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReviewFormat {
    Table,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
    Csv,
}

pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => eprintln!("{} {}", "✓".green(), msg.as_ref()),
            _ => self.print_json(&json!({ "type": "success", "message": msg.as_ref() })),
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        // Errors should always be shown, even in quiet mode
        match self.format {
            OutputFormat::Human => eprintln!("{} {}", "✗".red(), msg.as_ref()),
            _ => self.print_json(&json!({ "type": "error", "message": msg.as_ref() })),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => eprintln!("{}", msg.as_ref()),
            _ => self.print_json(&json!({ "type": "info", "message": msg.as_ref() })),
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => eprintln!("{} {}", "⚠".yellow(), msg.as_ref()),
            _ => self.print_json(&json!({ "type": "warning", "message": msg.as_ref() })),
        }
    }

    // Status lines go to stderr so stdout carries only the review listing
    fn print_json(&self, data: &serde_json::Value) {
        let line = match self.format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(data).unwrap_or_default(),
            _ => serde_json::to_string(data).unwrap_or_default(),
        };
        eprintln!("{}", line);
    }
}

/// Reviews (or the failure) for one scraped page.
#[derive(Debug, Serialize)]
pub struct PageReport {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageReport {
    pub fn ok(url: impl Into<String>, reviews: Vec<Review>) -> Self {
        Self {
            url: url.into(),
            reviews: Some(reviews),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl ToString) -> Self {
        Self {
            url: url.into(),
            reviews: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    url: &'a str,
    date: &'a str,
    rating: u8,
    content: &'a str,
    useful_count: u32,
}

/// Render `reports` into `writer`. `styled` enables colors in the table format.
pub fn write_reports<W: Write>(
    mut writer: W,
    format: ReviewFormat,
    reports: &[PageReport],
    styled: bool,
) -> anyhow::Result<()> {
    match format {
        ReviewFormat::Json => {
            serde_json::to_writer(&mut writer, reports)?;
            writeln!(writer)?;
        }
        ReviewFormat::JsonPretty => {
            serde_json::to_writer_pretty(&mut writer, reports)?;
            writeln!(writer)?;
        }
        ReviewFormat::Csv => {
            // Failed pages have no rows; their errors go to the status stream
            let mut csv_writer = csv::Writer::from_writer(writer);
            for report in reports {
                for review in report.reviews.iter().flatten() {
                    csv_writer.serialize(CsvRow {
                        url: &report.url,
                        date: &review.date,
                        rating: review.rating,
                        content: &review.content,
                        useful_count: review.useful_count,
                    })?;
                }
            }
            csv_writer.flush()?;
        }
        ReviewFormat::Table => {
            for report in reports {
                if styled {
                    writeln!(writer, "{}", report.url.bold())?;
                } else {
                    writeln!(writer, "{}", report.url)?;
                }
                match (&report.reviews, &report.error) {
                    (_, Some(error)) if styled => writeln!(writer, "{} {}", "✗".red(), error)?,
                    (_, Some(error)) => writeln!(writer, "✗ {}", error)?,
                    (Some(reviews), None) if reviews.is_empty() => writeln!(writer, "  no reviews found")?,
                    (Some(reviews), None) => writeln!(writer, "{}", review_table(reviews, styled))?,
                    (None, None) => {}
                }
                writeln!(writer)?;
            }
        }
    }
    Ok(())
}

fn review_table(reviews: &[Review], styled: bool) -> Table {
    let mut table = Table::new();
    if styled {
        table.enforce_styling();
    } else {
        table.force_no_tty();
    }
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Rating").add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Helpful").add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Review").add_attribute(comfy_table::Attribute::Bold),
        ]);

    for review in reviews {
        table.add_row(vec![
            Cell::new(&review.date),
            Cell::new(stars(review.rating)).fg(comfy_table::Color::Yellow),
            Cell::new(review.useful_count),
            Cell::new(&review.content),
        ]);
    }
    table
}

fn stars(rating: u8) -> String {
    let full = rating.min(5) as usize;
    format!("{}{}", "★".repeat(full), "☆".repeat(5 - full))
}

/// Render the whole listing first, then write it in one go. A closed pipe
/// on the reader's side counts as success.
pub fn emit_reports<W: Write>(
    mut writer: W,
    format: ReviewFormat,
    reports: &[PageReport],
    styled: bool,
) -> anyhow::Result<()> {
    let mut rendered = Vec::new();
    write_reports(&mut rendered, format, reports, styled)?;
    match writer.write_all(&rendered).and_then(|_| writer.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}

/// Write to stdout, styled only when stdout is a terminal
pub fn print_reports(format: ReviewFormat, reports: &[PageReport]) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let styled = stdout.is_terminal();
    emit_reports(stdout.lock(), format, reports, styled)
}
