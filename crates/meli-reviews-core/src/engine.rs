use crate::error::{InteractionError, RenderError};
use async_trait::async_trait;
use std::time::Duration;

/// Starts isolated browser sessions. One session per render, never shared.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError>;
}

/// A single page in a freshly launched browser.
///
/// Timeouts passed to these methods are hints for the engine; the renderer
/// enforces its own bounds around every call.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Wait for `selector` to appear, then click it.
    async fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), InteractionError>;

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), InteractionError>;

    /// Number of elements currently matching `selector`.
    async fn count(&mut self, selector: &str) -> Result<usize, InteractionError>;

    /// Full markup of the rendered document.
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Tear down the browser. Calling it again after success is a no-op.
    async fn close(&mut self) -> Result<(), RenderError>;
}
