use crate::engine::{BrowserEngine, BrowserSession};
use crate::error::{InteractionError, RenderError};
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use meli_reviews_config::{BrowserSettings, PathManager};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use which::which;

const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const HANDLER_MAX_ERRORS: usize = 10;
/// CDP request headroom over the navigation timeout, so slow navigations
/// surface as renderer timeouts rather than CDP request errors
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Launches one headless Chromium process per session, each with a throwaway profile.
pub struct ChromiumEngine {
    executable: PathBuf,
    settings: BrowserSettings,
    request_timeout: Duration,
}

impl ChromiumEngine {
    /// Resolve the Chromium binary once. Downloads it when allowed and nothing is installed.
    pub async fn new(settings: BrowserSettings, navigation_timeout: Duration) -> Result<Self, RenderError> {
        let executable = match settings.executable.clone() {
            Some(path) => {
                info!("Using configured Chromium: {:?}", path);
                path
            }
            None => match find_system_chromium() {
                Some(path) => {
                    info!("Found system Chromium: {:?}", path);
                    path
                }
                None if settings.fetch_if_missing => fetch_chromium().await?,
                None => {
                    return Err(RenderError::Launch(
                        "no Chromium installation found and downloading is disabled".to_string(),
                    ))
                }
            },
        };

        Ok(Self {
            executable,
            settings,
            request_timeout: navigation_timeout + REQUEST_TIMEOUT_SLACK,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn build_browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .user_data_dir(profile_dir)
            .request_timeout(self.request_timeout);

        if !self.settings.headless {
            builder = builder.with_head();
        }

        let is_docker = is_docker();
        let is_macos = cfg!(target_os = "macos");

        if is_docker || !is_macos {
            builder = builder
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage");
        }

        builder = builder
            .arg("--disable-extensions")
            .arg("--disable-notifications")
            .arg("--log-level=3")
            .arg("--disable-sync")
            .arg("--disable-default-apps")
            .arg("--disable-background-timer-throttling")
            .arg("--disable-renderer-backgrounding")
            .arg("--window-size=1280,900");

        if is_docker {
            builder = builder
                .arg("--disable-gpu")
                .arg("--disable-crash-reporter")
                .arg("--disable-breakpad");
        }

        if is_macos && !is_docker {
            builder = builder.arg("--disable-setuid-sandbox");
        }

        for arg in &self.settings.extra_args {
            builder = builder.arg(arg.as_str());
        }

        builder
            .build()
            .map_err(|e| RenderError::Launch(format!("failed to build browser config: {}", e)))
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        let profile = tempfile::Builder::new()
            .prefix("meli-reviews-profile-")
            .tempdir()
            .map_err(|e| RenderError::Launch(format!("failed to create profile directory: {}", e)))?;

        let config = self.build_browser_config(profile.path())?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(format!("failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            let mut error_count = 0;
            while let Some(event) = handler.next().await {
                match event {
                    Ok(_) => error_count = 0,
                    Err(e) => {
                        error_count += 1;
                        warn!("Browser handler error (count: {}/{}): {:?}", error_count, HANDLER_MAX_ERRORS, e);
                        if error_count >= HANDLER_MAX_ERRORS {
                            error!("Browser handler received {} consecutive errors, browser process may have crashed", error_count);
                            break;
                        }
                    }
                }
            }
            debug!("Browser handler task ended");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Some(Err(kill_err)) = browser.kill().await {
                    warn!("Failed to kill browser after page creation error: {}", kill_err);
                }
                handler_task.abort();
                return Err(RenderError::Launch(format!("failed to open page: {}", e)));
            }
        };

        debug!(profile = ?profile.path(), "Browser session started");
        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            _profile: profile,
            closed: false,
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    // Removed from disk when the session is dropped
    _profile: TempDir,
    closed: bool,
}

impl ChromiumSession {
    async fn find_when_present(&self, selector: &str, wait: Duration) -> Result<Element, InteractionError> {
        let poll = async {
            loop {
                match self.page.find_element(selector).await {
                    Ok(element) => return element,
                    Err(_) => sleep(ELEMENT_POLL_INTERVAL).await,
                }
            }
        };
        timeout(wait, poll).await.map_err(|_| InteractionError::Timeout {
            selector: selector.to_string(),
            timeout_ms: wait.as_millis(),
        })
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, wait: Duration) -> Result<(), RenderError> {
        match timeout(wait, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(RenderError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: wait.as_millis(),
            }),
        }
    }

    async fn click(&mut self, selector: &str, wait: Duration) -> Result<(), InteractionError> {
        let element = self.find_when_present(selector, wait).await?;
        element
            .click()
            .await
            .map_err(|e| InteractionError::Engine(e.to_string()))?;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, wait: Duration) -> Result<(), InteractionError> {
        self.find_when_present(selector, wait).await.map(|_| ())
    }

    async fn count(&mut self, selector: &str) -> Result<usize, InteractionError> {
        let quoted = serde_json::to_string(selector).map_err(|e| InteractionError::Engine(e.to_string()))?;
        let result = self
            .page
            .evaluate(format!("document.querySelectorAll({}).length", quoted))
            .await
            .map_err(|e| InteractionError::Engine(e.to_string()))?;
        result
            .into_value::<usize>()
            .map_err(|e| InteractionError::Engine(e.to_string()))
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if self.closed {
            return Ok(());
        }

        let result = match self.browser.close().await {
            Ok(_) => match self.browser.wait().await {
                Ok(_) => Ok(()),
                Err(e) => Err(RenderError::Teardown(format!("browser did not exit: {}", e))),
            },
            Err(e) => {
                if let Some(Err(kill_err)) = self.browser.kill().await {
                    warn!("Failed to kill browser: {}", kill_err);
                }
                Err(RenderError::Teardown(e.to_string()))
            }
        };

        self.handler_task.abort();
        self.closed = true;
        debug!("Browser session closed");
        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if !self.closed {
            // Cancelled mid-render; chromiumoxide kills the child process when the Browser drops
            warn!("Browser session dropped without close, killing browser process");
            self.handler_task.abort();
        }
    }
}

/// Check if we're running in Docker
fn is_docker() -> bool {
    Path::new("/.dockerenv").exists()
        || std::fs::read_to_string("/proc/self/cgroup")
            .ok()
            .map(|s| s.contains("docker") || s.contains("containerd"))
            .unwrap_or(false)
}

fn find_system_chromium() -> Option<PathBuf> {
    let mut candidates = vec![
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/local/bin/chromium",
        "/usr/local/bin/chromium-browser",
        "/opt/chromium/chromium",
        "/usr/bin/google-chrome",
    ];
    if cfg!(target_os = "macos") {
        candidates.splice(
            0..0,
            [
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                "/opt/homebrew/bin/chromium",
            ],
        );
    }

    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
        .or_else(|| {
            which("chromium")
                .or_else(|_| which("chromium-browser"))
                .or_else(|_| which("google-chrome"))
                .ok()
        })
}

async fn fetch_chromium() -> Result<PathBuf, RenderError> {
    let download_dir = PathManager::default().browser_downloads_dir();
    info!("No system Chromium found, downloading via BrowserFetcher into {:?}", download_dir);

    tokio::fs::create_dir_all(&download_dir)
        .await
        .map_err(|e| RenderError::Launch(format!("failed to create {:?}: {}", download_dir, e)))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&download_dir)
        .build()
        .map_err(|e| RenderError::Launch(format!("failed to create BrowserFetcherOptions: {}", e)))?;

    let revision = BrowserFetcher::new(options)
        .fetch()
        .await
        .map_err(|e| RenderError::Launch(format!("failed to fetch Chromium: {}", e)))?;

    info!("Chromium downloaded to: {:?}", revision.executable_path);
    Ok(revision.executable_path)
}
