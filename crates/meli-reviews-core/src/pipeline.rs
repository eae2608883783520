use crate::chromium::ChromiumEngine;
use crate::error::ScrapeError;
use crate::extractor::extract;
use crate::renderer::{RenderOptions, Renderer};
use futures::stream::{self, StreamExt};
use meli_reviews_config::BrowserSettings;
use meli_reviews_models::Review;
use std::sync::Arc;
use tracing::{info, warn};

/// Render then extract. Holds no per-scrape state, so one instance can serve
/// many concurrent calls.
#[derive(Clone)]
pub struct Scraper {
    renderer: Renderer,
    options: RenderOptions,
}

impl Scraper {
    pub fn new(renderer: Renderer, options: RenderOptions) -> Self {
        Self { renderer, options }
    }

    /// Scraper backed by a local Chromium with default settings
    pub async fn chromium(options: RenderOptions) -> Result<Self, ScrapeError> {
        let engine = ChromiumEngine::new(BrowserSettings::default(), options.navigation_timeout).await?;
        Ok(Self::new(Renderer::new(Arc::new(engine)), options))
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub async fn scrape(&self, url: &str) -> Result<Vec<Review>, ScrapeError> {
        info!(url, "Starting scrape");
        let html = self.renderer.render(url, &self.options).await?;
        Ok(extract(&html)?)
    }

    /// Scrape several pages, at most `concurrency` at a time. Results come back in input order.
    pub async fn scrape_many(&self, urls: &[String], concurrency: usize) -> Vec<Result<Vec<Review>, ScrapeError>> {
        stream::iter(urls)
            .map(|url| async move {
                let result = self.scrape(url).await;
                if let Err(e) = &result {
                    warn!(url = %url, "Scrape failed: {}", e);
                }
                result
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

/// One-shot scrape with default timeouts and a local Chromium.
pub async fn scrape(url: &str) -> Result<Vec<Review>, ScrapeError> {
    Scraper::chromium(RenderOptions::default()).await?.scrape(url).await
}
