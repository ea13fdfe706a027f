//! chromiumoxide-backed rendering service.
//!
//! Every session launches its own browser process with a throwaway profile
//! directory. The browser, its CDP handler task and the profile directory
//! live exactly as long as the session.
//!
//! A render navigates, then waits for the `networkIdle` lifecycle event of
//! that navigation (bounded by the idle timeout) and for at least the settle
//! delay before serializing the document.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::LoaderId;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::listeners::EventStream;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::protocols::{RenderSession, Renderer};
use crate::config::RenderConfig;
use crate::errors::{FetchError, PipelineError};

const NETWORK_IDLE: &str = "networkIdle";

/// Launches a headless Chrome/Chromium per fetch attempt.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    config: RenderConfig,
    idle_timeout: Duration,
}

impl ChromiumRenderer {
    /// Creates a renderer with the given configuration.
    pub fn new(config: RenderConfig) -> Result<Self, PipelineError> {
        let idle_timeout = config.idle_timeout()?;
        Ok(Self {
            config,
            idle_timeout,
        })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn acquire(&self) -> Result<Box<dyn RenderSession>, FetchError> {
        // A unique profile avoids SingletonLock conflicts between sessions.
        let profile = tempfile::Builder::new()
            .prefix("pagepreview-profile-")
            .tempdir()
            .map_err(|e| FetchError::render("", format!("Failed to create profile directory: {e}")))?;

        let (width, height) = self.config.window_size;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .window_size(width, height)
            .args(self.config.args.iter().cloned());
        if let Some(ref executable) = self.config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let browser_config = builder
            .build()
            .map_err(|e| FetchError::render("", format!("Failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::render("", format!("Failed to launch browser: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let message = e.to_string();
                    // Unknown CDP messages are routine with newer browsers.
                    if message.contains("did not match any variant") {
                        continue;
                    }
                    debug!("CDP handler error: {}", message);
                    if message.contains("connection closed") || message.contains("websocket closed") {
                        break;
                    }
                }
            }
        });

        debug!("Browser session acquired (profile {})", profile.path().display());

        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            handler_task: Some(handler_task),
            profile: Some(profile),
            idle_timeout: self.idle_timeout,
            settle_delay: self.config.settle_delay(),
        }))
    }
}

/// A single headless browser process.
struct ChromiumSession {
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
    profile: Option<tempfile::TempDir>,
    idle_timeout: Duration,
    settle_delay: Duration,
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn render(&mut self, url: &str) -> Result<String, FetchError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| FetchError::render(url, "browser session already released"))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::render(url, e.to_string()))?;

        let rendered = async {
            page.execute(SetLifecycleEventsEnabledParams::new(true))
                .await
                .map_err(|e| FetchError::render(url, format!("lifecycle events unavailable: {e}")))?;
            let lifecycle = page
                .event_listener::<EventLifecycleEvent>()
                .await
                .map_err(|e| FetchError::render(url, format!("lifecycle events unavailable: {e}")))?;

            let navigation = page
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| FetchError::render(url, format!("navigation failed: {e}")))?;
            if let Some(ref reason) = navigation.result.error_text {
                return Err(FetchError::render(url, format!("navigation failed: {reason}")));
            }

            let quiescence = tokio::time::timeout(
                self.idle_timeout,
                wait_for_network_idle(lifecycle, navigation.result.loader_id.clone()),
            );
            let (idle, ()) = tokio::join!(quiescence, tokio::time::sleep(self.settle_delay));
            if !matches!(idle, Ok(true)) {
                debug!("No network idle for {} within {:?}", url, self.idle_timeout);
            }

            page.content()
                .await
                .map_err(|e| FetchError::render(url, format!("failed to read document: {e}")))
        }
        .await;

        if let Err(e) = page.close().await {
            debug!("Page close error (ignored): {}", e);
        }

        rendered
    }

    async fn release(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("Browser close error (ignored): {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser wait error (ignored): {}", e);
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        self.profile.take();
        debug!("Browser session released");
    }
}

/// Resolves once the navigation identified by `loader` reports `networkIdle`.
///
/// Same-document navigations have no loader, so any `networkIdle` counts.
/// Returns `false` when the event stream ends first.
async fn wait_for_network_idle(
    mut events: EventStream<EventLifecycleEvent>,
    loader: Option<LoaderId>,
) -> bool {
    while let Some(event) = events.next().await {
        if event.name != NETWORK_IDLE {
            continue;
        }
        match loader {
            Some(ref loader) if *loader != event.loader_id => {}
            _ => return true,
        }
    }
    false
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Reached when the owning future is cancelled before `release`.
        // Dropping `Browser` kills the child process.
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        if self.browser.take().is_some() {
            debug!("Browser session dropped without release");
        }
    }
}
