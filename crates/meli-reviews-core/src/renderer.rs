use crate::engine::{BrowserEngine, BrowserSession};
use crate::error::{InteractionError, RenderError};
use crate::selectors;
use browser_debug::{DebugConfig, RenderTrace};
use meli_reviews_config::TimeoutConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Hard bound on navigation; exceeding it fails the render
    pub navigation_timeout: Duration,
    pub show_more_timeout: Duration,
    pub expansion_timeout: Duration,
    /// Minimum wait after the interaction steps
    pub settle_delay: Duration,
    /// How long to keep polling for a stable review count after the delay. Zero disables polling.
    pub settle_timeout: Duration,
    pub settle_poll_interval: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for RenderOptions {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            navigation_timeout: config.navigation(),
            show_more_timeout: config.show_more(),
            expansion_timeout: config.expansion(),
            settle_delay: config.settle_delay(),
            settle_timeout: config.settle_timeout(),
            settle_poll_interval: config.settle_poll(),
        }
    }
}

/// Produces the fully rendered markup of a product page.
#[derive(Clone)]
pub struct Renderer {
    engine: Arc<dyn BrowserEngine>,
    debug: DebugConfig,
}

impl Renderer {
    pub fn new(engine: Arc<dyn BrowserEngine>) -> Self {
        Self::with_debug(engine, DebugConfig::from_env())
    }

    pub fn with_debug(engine: Arc<dyn BrowserEngine>, debug: DebugConfig) -> Self {
        Self { engine, debug }
    }

    /// Render `url` in a fresh browser session and return the document markup.
    ///
    /// The session is closed on every path out of this function; if the future is
    /// dropped early the session's own drop handler kills the browser.
    pub async fn render(&self, url: &str, options: &RenderOptions) -> Result<String, RenderError> {
        let mut trace = RenderTrace::start(&self.debug, url);

        trace.start_step("launch");
        let mut session = match self.engine.launch().await {
            Ok(session) => {
                trace.end_step(true, None);
                session
            }
            Err(e) => {
                trace.end_step(false, Some(e.to_string()));
                trace.finish();
                return Err(e);
            }
        };

        let rendered = drive(session.as_mut(), url, options, &mut trace).await;

        trace.start_step("close");
        let closed = session.close().await;
        trace.end_step(closed.is_ok(), closed.as_ref().err().map(|e| e.to_string()));
        trace.finish();

        match (rendered, closed) {
            (Ok(html), Ok(())) => Ok(html),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("Failed to close browser after render error: {}", close_err);
                Err(e)
            }
        }
    }
}

async fn drive(
    session: &mut dyn BrowserSession,
    url: &str,
    options: &RenderOptions,
    trace: &mut RenderTrace,
) -> Result<String, RenderError> {
    info!(url, "Navigating to product page");
    trace.start_step("navigate");
    let navigated = match timeout(options.navigation_timeout, session.navigate(url, options.navigation_timeout)).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::NavigationTimeout {
            url: url.to_string(),
            timeout_ms: options.navigation_timeout.as_millis(),
        }),
    };
    if let Err(e) = navigated {
        trace.end_step(false, Some(e.to_string()));
        return Err(e);
    }
    trace.end_step(true, None);

    trace.start_step("show_more");
    let clicked = bounded(
        selectors::SHOW_MORE_BUTTON,
        options.show_more_timeout,
        session.click(selectors::SHOW_MORE_BUTTON, options.show_more_timeout),
    )
    .await;
    match &clicked {
        Ok(()) => {
            debug!("Clicked show-all-reviews control");
            trace.end_step(true, None);
        }
        Err(e) => {
            info!("More reviews button not found or timed out: {}", e);
            trace.end_step(false, Some(e.to_string()));
        }
    }

    if clicked.is_ok() {
        trace.start_step("expansion");
        match bounded(
            selectors::EXPANDED_CONTAINER,
            options.expansion_timeout,
            session.wait_for(selectors::EXPANDED_CONTAINER, options.expansion_timeout),
        )
        .await
        {
            Ok(()) => trace.end_step(true, None),
            Err(e) => {
                info!("Expanded reviews container did not appear: {}", e);
                trace.end_step(false, Some(e.to_string()));
            }
        }
    }

    trace.start_step("settle");
    let settled = settle(session, options).await;
    trace.end_step(true, settled.map(|count| format!("{} review nodes", count)));

    trace.start_step("capture");
    match session.content().await {
        Ok(html) => {
            trace.save_markup(&html);
            trace.end_step(true, Some(format!("{} bytes", html.len())));
            debug!(bytes = html.len(), "Captured rendered markup");
            Ok(html)
        }
        Err(e) => {
            trace.end_step(false, Some(e.to_string()));
            Err(e)
        }
    }
}

/// Apply the renderer's own bound to a session interaction.
async fn bounded<F>(selector: &str, limit: Duration, interaction: F) -> Result<(), InteractionError>
where
    F: Future<Output = Result<(), InteractionError>>,
{
    match timeout(limit, interaction).await {
        Ok(result) => result,
        Err(_) => Err(InteractionError::Timeout {
            selector: selector.to_string(),
            timeout_ms: limit.as_millis(),
        }),
    }
}

/// Fixed delay, then poll the review count until two reads agree or the budget runs out.
/// Returns the last count observed, if any.
async fn settle(session: &mut dyn BrowserSession, options: &RenderOptions) -> Option<usize> {
    sleep(options.settle_delay).await;
    if options.settle_timeout.is_zero() {
        return None;
    }

    let deadline = Instant::now() + options.settle_timeout;
    let mut last = read_count(session, deadline).await?;

    loop {
        if Instant::now() + options.settle_poll_interval > deadline {
            debug!(count = last, "Review count still changing when settle budget ran out");
            return Some(last);
        }
        sleep(options.settle_poll_interval).await;

        let current = read_count(session, deadline).await?;
        if current == last {
            debug!(count = current, "Review count stable");
            return Some(current);
        }
        debug!(previous = last, current, "Review count changed, waiting");
        last = current;
    }
}

async fn read_count(session: &mut dyn BrowserSession, deadline: Instant) -> Option<usize> {
    match timeout_at(deadline, session.count(selectors::REVIEW)).await {
        Ok(Ok(count)) => Some(count),
        Ok(Err(e)) => {
            debug!("Could not count review nodes: {}", e);
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEngine, MockScript, NavigateBehavior};

    fn fast_options() -> RenderOptions {
        RenderOptions {
            navigation_timeout: Duration::from_secs(60),
            show_more_timeout: Duration::from_secs(5),
            expansion_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_secs(1),
            settle_timeout: Duration::from_secs(3),
            settle_poll_interval: Duration::from_millis(250),
        }
    }

    fn renderer(engine: &MockEngine) -> Renderer {
        Renderer::with_debug(Arc::new(engine.clone()), DebugConfig::disabled())
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_returns_markup_and_closes_session() {
        let engine = MockEngine::new(MockScript {
            html: "<html><body>ok</body></html>".to_string(),
            ..MockScript::default()
        });

        let html = renderer(&engine).render("https://example.com/p", &fast_options()).await.unwrap();

        assert_eq!(html, "<html><body>ok</body></html>");
        assert_eq!(engine.launches(), 1);
        assert_eq!(engine.closes(), 1);
        assert_eq!(engine.calls()[0], "navigate https://example.com/p");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clicks_show_more_and_waits_for_container() {
        let engine = MockEngine::new(MockScript {
            has_show_more: true,
            has_container: true,
            ..MockScript::default()
        });

        renderer(&engine).render("https://example.com/p", &fast_options()).await.unwrap();

        let calls = engine.calls();
        assert!(calls.contains(&format!("click {}", selectors::SHOW_MORE_BUTTON)));
        assert!(calls.contains(&format!("wait_for {}", selectors::EXPANDED_CONTAINER)));
        assert_eq!(calls.last().unwrap(), "close");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_show_more_skips_expansion_wait() {
        let engine = MockEngine::new(MockScript {
            has_show_more: false,
            has_container: true,
            ..MockScript::default()
        });

        let result = renderer(&engine).render("https://example.com/p", &fast_options()).await;

        assert!(result.is_ok());
        assert!(!engine.calls().iter().any(|c| c.starts_with("wait_for")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_container_is_not_fatal() {
        let engine = MockEngine::new(MockScript {
            has_show_more: true,
            has_container: false,
            html: "<html></html>".to_string(),
            ..MockScript::default()
        });

        let html = renderer(&engine).render("https://example.com/p", &fast_options()).await.unwrap();
        assert_eq!(html, "<html></html>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_click_is_bounded_by_show_more_timeout() {
        let engine = MockEngine::new(MockScript {
            click_hangs: true,
            ..MockScript::default()
        });
        let started = Instant::now();

        renderer(&engine).render("https://example.com/p", &fast_options()).await.unwrap();

        // 5s click bound + 1s settle delay + at most 3s of polling
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!engine.calls().iter().any(|c| c.starts_with("wait_for")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_timeout_is_fatal_and_closes_session() {
        let engine = MockEngine::new(MockScript {
            navigate: NavigateBehavior::Hang,
            ..MockScript::default()
        });

        let err = renderer(&engine).render("https://example.com/p", &fast_options()).await.unwrap_err();

        assert!(matches!(err, RenderError::NavigationTimeout { timeout_ms: 60_000, .. }));
        assert_eq!(engine.closes(), 1);
        assert!(!engine.calls().iter().any(|c| c == "content"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_is_fatal() {
        let engine = MockEngine::new(MockScript {
            navigate: NavigateBehavior::Fail("net::ERR_NAME_NOT_RESOLVED".to_string()),
            ..MockScript::default()
        });

        let err = renderer(&engine).render("not a url", &fast_options()).await.unwrap_err();

        assert!(matches!(err, RenderError::Navigation { .. }));
        assert_eq!(engine.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_is_render_error() {
        let engine = MockEngine::new(MockScript {
            launch_fails: true,
            ..MockScript::default()
        });

        let err = renderer(&engine).render("https://example.com/p", &fast_options()).await.unwrap_err();

        assert!(matches!(err, RenderError::Launch(_)));
        assert_eq!(engine.closes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_failure_after_success_is_reported() {
        let engine = MockEngine::new(MockScript {
            close_fails: true,
            ..MockScript::default()
        });

        let err = renderer(&engine).render("https://example.com/p", &fast_options()).await.unwrap_err();
        assert!(matches!(err, RenderError::Teardown(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_stops_once_count_is_stable() {
        let engine = MockEngine::new(MockScript {
            counts: vec![3, 7, 9, 9, 12],
            ..MockScript::default()
        });

        renderer(&engine).render("https://example.com/p", &fast_options()).await.unwrap();

        let count_calls = engine.calls().iter().filter(|c| c.starts_with("count")).count();
        assert_eq!(count_calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_gives_up_when_count_never_stabilizes() {
        let engine = MockEngine::new(MockScript {
            counts: (0..1000).collect(),
            html: "<html></html>".to_string(),
            ..MockScript::default()
        });
        let options = fast_options();
        let started = Instant::now();

        let html = renderer(&engine).render("https://example.com/p", &options).await.unwrap();

        assert_eq!(html, "<html></html>");
        assert!(started.elapsed() <= options.settle_delay + options.settle_timeout);
        // One read per poll interval across the 3s budget, plus the first read
        let count_calls = engine.calls().iter().filter(|c| c.starts_with("count")).count();
        assert!(count_calls >= 2);
        assert!(count_calls <= 13, "{} count reads", count_calls);
        assert_eq!(engine.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_expansion_wait_is_bounded_by_expansion_timeout() {
        let engine = MockEngine::new(MockScript {
            has_show_more: true,
            wait_for_hangs: true,
            html: "<html><body>partial</body></html>".to_string(),
            ..MockScript::default()
        });
        let options = fast_options();
        let started = Instant::now();

        let html = renderer(&engine).render("https://example.com/p", &options).await.unwrap();

        assert_eq!(html, "<html><body>partial</body></html>");
        let elapsed = started.elapsed();
        assert!(elapsed >= options.expansion_timeout);
        assert!(elapsed <= options.expansion_timeout + options.settle_delay + options.settle_timeout);
        let calls = engine.calls();
        assert!(calls.contains(&format!("wait_for {}", selectors::EXPANDED_CONTAINER)));
        assert!(calls.contains(&"content".to_string()));
        assert_eq!(engine.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_polling_disabled_uses_fixed_delay_only() {
        let engine = MockEngine::new(MockScript::default());
        let options = RenderOptions {
            settle_timeout: Duration::ZERO,
            ..fast_options()
        };
        let started = Instant::now();

        renderer(&engine).render("https://example.com/p", &options).await.unwrap();

        assert!(!engine.calls().iter().any(|c| c.starts_with("count")));
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[test]
    fn test_options_from_default_config() {
        let options = RenderOptions::default();
        assert_eq!(options.navigation_timeout, Duration::from_millis(60_000));
        assert_eq!(options.show_more_timeout, Duration::from_millis(5_000));
        assert_eq!(options.expansion_timeout, Duration::from_millis(5_000));
        assert_eq!(options.settle_delay, Duration::from_millis(1_000));
    }
}
