use crate::error::ParseError;
use crate::selectors::{CONTENT_SELECTOR, DATE_SELECTOR, FULL_STAR_SELECTOR, REVIEW_SELECTOR, USEFUL_LABEL_SELECTOR};
use meli_reviews_models::review::MAX_RATING;
use meli_reviews_models::{DedupKey, Review};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};

/// Parse rendered page markup into unique reviews, in document order.
///
/// Reviews are deduplicated on `(date, content)`; the first node wins. Missing
/// sub-elements default the affected field only. Fails only when the input is
/// not markup at all.
pub fn extract(markup: &str) -> Result<Vec<Review>, ParseError> {
    if markup.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if !markup.contains('<') {
        return Err(ParseError::NotMarkup);
    }

    let document = Html::parse_document(markup);

    let mut seen: HashSet<DedupKey> = HashSet::new();
    let mut reviews = Vec::new();
    let mut nodes = 0;

    for element in document.select(&REVIEW_SELECTOR) {
        nodes += 1;
        let review = parse_review(element);
        if !seen.insert(review.dedup_key()) {
            debug!(date = %review.date, "Skipping duplicate review");
            continue;
        }
        reviews.push(review);
    }

    info!(nodes, unique = reviews.len(), "Parsed {} unique reviews", reviews.len());
    Ok(reviews)
}

fn parse_review(element: ElementRef<'_>) -> Review {
    let date = first_text(element, &DATE_SELECTOR).unwrap_or_default();
    let content = first_text(element, &CONTENT_SELECTOR).unwrap_or_default();
    let stars = element.select(&FULL_STAR_SELECTOR).count();
    let rating = stars.min(MAX_RATING as usize) as u8;
    let useful_count = first_text(element, &USEFUL_LABEL_SELECTOR)
        .map(|label| parse_useful_count(&label))
        .unwrap_or(0);

    Review {
        date,
        rating,
        content,
        useful_count,
    }
}

/// Text of the first match, with each text node trimmed and the pieces joined.
fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|found| found.text().map(str::trim).collect::<String>())
}

/// Only a bare run of ASCII digits counts; anything else is treated as zero votes.
/// Counts beyond `u32` saturate.
fn parse_useful_count(label: &str) -> u32 {
    if !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit()) {
        label.parse().unwrap_or(u32::MAX)
    } else {
        0
    }
}
