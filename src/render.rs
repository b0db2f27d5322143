//! Headless browser rendering of review pages.
//!
//! Review pages are client-side rendered, so a plain HTTP GET returns an
//! empty shell. The browser is driven through the DevTools protocol.

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use crate::utils::fmt_duration;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to launch headless browser")]
    Launch(#[source] anyhow::Error),
    #[error("failed to navigate to {url}")]
    Navigation {
        url: Url,
        #[source]
        source: anyhow::Error,
    },
    #[error("render task panicked or was cancelled")]
    Join(#[from] tokio::task::JoinError),
}

/// Fully rendered HTML of a page, as serialized by the browser.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: Url,
    pub html: String,
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError>;
}

/// Browser launch settings.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub chrome_path: Option<PathBuf>,
    /// Wait after navigation for client-side rendering to settle.
    pub settle: Duration,
}

/// A single headless Chrome process, started on the first render.
///
/// Launch failures surface from `render`, like navigation failures. The
/// process is killed when the last handle is dropped, so it is released on
/// every exit path.
pub struct ChromeRenderer {
    options: RenderOptions,
    browser: Arc<Mutex<Option<Browser>>>,
}

impl ChromeRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            browser: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a headless browser with the GPU disabled.
    fn launch(options: &RenderOptions) -> Result<Browser, RenderError> {
        let launch = LaunchOptions::default_builder()
            .headless(true)
            .path(options.chrome_path.clone())
            .args(vec![OsStr::new("--disable-gpu")])
            // Keep the DevTools connection open across the settle delay.
            .idle_browser_timeout(options.settle + Duration::from_secs(60))
            .build()
            .map_err(|e| RenderError::Launch(anyhow::anyhow!(e)))?;

        let browser = Browser::new(launch).map_err(RenderError::Launch)?;
        info!(settle = fmt_duration(options.settle), "headless browser launched");
        Ok(browser)
    }

    /// The running browser, launching it if this is the first use.
    fn browser(
        slot: &Mutex<Option<Browser>>,
        options: &RenderOptions,
    ) -> Result<Browser, RenderError> {
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(browser) = slot.as_ref() {
            return Ok(browser.clone());
        }
        let browser = Self::launch(options)?;
        *slot = Some(browser.clone());
        Ok(browser)
    }

    /// Shut the browser down now rather than at drop.
    pub fn close(self) {
        let browser = self
            .browser
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(browser) = browser {
            drop(browser);
            info!("headless browser released");
        }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let slot = Arc::clone(&self.browser);
        let options = self.options.clone();
        let target = url.clone();

        let html = tokio::task::spawn_blocking(move || -> Result<String, RenderError> {
            let browser = Self::browser(&slot, &options)?;
            let navigation = |source| RenderError::Navigation {
                url: target.clone(),
                source,
            };

            let start = Instant::now();
            let tab = browser.new_tab().map_err(navigation)?;
            tab.navigate_to(target.as_str())
                .and_then(|tab| tab.wait_until_navigated())
                .map_err(navigation)?;
            debug!(url = %target, duration = fmt_duration(start.elapsed()), "navigation finished");

            std::thread::sleep(options.settle);
            let html = tab.get_content().map_err(navigation)?;
            // Best effort: the tab goes away with the browser anyway.
            if let Err(e) = tab.close(true) {
                debug!(error = %e, "failed to close tab");
            }
            Ok(html)
        })
        .await??;

        info!(url = %url, bytes = html.len(), "page rendered");
        Ok(RenderedPage {
            url: url.clone(),
            html,
        })
    }
}
