pub mod chromium;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod renderer;
pub mod selectors;

#[cfg(test)]
pub(crate) mod testing;

pub use chromium::ChromiumEngine;
pub use engine::{BrowserEngine, BrowserSession};
pub use error::{InteractionError, ParseError, RenderError, ScrapeError};
pub use extractor::extract;
pub use pipeline::{scrape, Scraper};
pub use renderer::{RenderOptions, Renderer};
pub use meli_reviews_models::Review;
