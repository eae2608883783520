use thiserror::Error;

/// Fatal failure while producing the rendered document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start browser session: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("navigation to {url} timed out after {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u128 },

    #[error("failed to capture page content: {0}")]
    Capture(String),

    #[error("failed to shut down browser session: {0}")]
    Teardown(String),
}

/// The captured document could not be treated as markup at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("markup is empty")]
    Empty,

    #[error("input does not contain any markup tags")]
    NotMarkup,
}

/// The two failure kinds surfaced by a scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Failure of a best-effort page interaction. Logged by the renderer, never returned.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("timed out after {timeout_ms} ms waiting for {selector}")]
    Timeout { selector: String, timeout_ms: u128 },

    #[error("browser error: {0}")]
    Engine(String),
}
