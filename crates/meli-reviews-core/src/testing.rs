//! Scripted browser used by the renderer and pipeline tests.

use crate::engine::{BrowserEngine, BrowserSession};
use crate::error::{InteractionError, RenderError};
use crate::selectors;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub enum NavigateBehavior {
    #[default]
    Succeed,
    Fail(String),
    Hang,
}

#[derive(Debug, Clone, Default)]
pub struct MockScript {
    pub launch_fails: bool,
    pub navigate: NavigateBehavior,
    pub has_show_more: bool,
    pub click_hangs: bool,
    pub has_container: bool,
    pub wait_for_hangs: bool,
    /// Successive review counts; the last one repeats
    pub counts: Vec<usize>,
    pub html: String,
    pub close_fails: bool,
}

#[derive(Default)]
struct MockLog {
    launches: usize,
    closes: usize,
    calls: Vec<String>,
}

#[derive(Clone)]
pub struct MockEngine {
    script: MockScript,
    // Per-URL markup overrides, for batch tests
    pages: Arc<HashMap<String, MockScript>>,
    log: Arc<Mutex<MockLog>>,
}

impl MockEngine {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            pages: Arc::new(HashMap::new()),
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    pub fn with_pages(pages: HashMap<String, MockScript>) -> Self {
        Self {
            script: MockScript::default(),
            pages: Arc::new(pages),
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    pub fn launches(&self) -> usize {
        self.log.lock().unwrap().launches
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl BrowserEngine for MockEngine {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        if self.script.launch_fails {
            return Err(RenderError::Launch("mock launch failure".to_string()));
        }
        self.log.lock().unwrap().launches += 1;
        Ok(Box::new(MockSession {
            script: self.script.clone(),
            pages: self.pages.clone(),
            log: self.log.clone(),
            count_reads: 0,
        }))
    }
}

struct MockSession {
    script: MockScript,
    pages: Arc<HashMap<String, MockScript>>,
    log: Arc<Mutex<MockLog>>,
    count_reads: usize,
}

impl MockSession {
    fn record(&self, call: String) {
        self.log.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), RenderError> {
        self.record(format!("navigate {}", url));
        if let Some(page) = self.pages.get(url) {
            self.script = page.clone();
        }
        match self.script.navigate.clone() {
            NavigateBehavior::Succeed => Ok(()),
            NavigateBehavior::Fail(message) => Err(RenderError::Navigation {
                url: url.to_string(),
                message,
            }),
            NavigateBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), InteractionError> {
        self.record(format!("click {}", selector));
        if self.script.click_hangs {
            std::future::pending::<()>().await;
        }
        if selector == selectors::SHOW_MORE_BUTTON && self.script.has_show_more {
            Ok(())
        } else {
            Err(InteractionError::Timeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis(),
            })
        }
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), InteractionError> {
        self.record(format!("wait_for {}", selector));
        if self.script.wait_for_hangs {
            std::future::pending::<()>().await;
        }
        if selector == selectors::EXPANDED_CONTAINER && self.script.has_container {
            Ok(())
        } else {
            Err(InteractionError::Timeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis(),
            })
        }
    }

    async fn count(&mut self, selector: &str) -> Result<usize, InteractionError> {
        self.record(format!("count {}", selector));
        let counts = &self.script.counts;
        let value = counts
            .get(self.count_reads)
            .or_else(|| counts.last())
            .copied()
            .unwrap_or(0);
        self.count_reads += 1;
        Ok(value)
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.record("content".to_string());
        Ok(self.script.html.clone())
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.record("close".to_string());
        self.log.lock().unwrap().closes += 1;
        if self.script.close_fails {
            Err(RenderError::Teardown("mock close failure".to_string()))
        } else {
            Ok(())
        }
    }
}
