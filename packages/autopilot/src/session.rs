//! Browser session lifecycle.
//!
//! One [`BrowserSession`] models one logical user: a single browser process,
//! a single tab, a single run. The session is acquired at the start of a run
//! and must be closed on every exit path; jobs are never processed in
//! parallel because concurrent modal interactions on one page would corrupt
//! state.

use std::path::PathBuf;
use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AutopilotError;
use crate::surface::{CdpSurface, PageSurface};

/// Launch options for the browser process.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    /// Reuse a persistent profile directory (cookies, saved profile data).
    pub user_data_dir: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_data_dir: None,
            window_width: 1280,
            window_height: 1024,
        }
    }
}

/// Exclusive owner of one browser process and its single working tab.
pub struct BrowserSession {
    browser: Browser,
    surface: Arc<CdpSurface>,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch the browser and open one blank tab.
    pub async fn launch(config: &SessionConfig) -> Result<Self, AutopilotError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .args(vec!["--disable-infobars", "--no-first-run"]);

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }

        let browser_config = builder
            .build()
            .map_err(AutopilotError::BrowserLaunch)?;

        info!(headless = config.headless, "launching browser");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| AutopilotError::BrowserLaunch(e.to_string()))?;

        // The CDP event stream must be driven for the connection to stay
        // alive; a transport error here means the browser went away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser event stream closed");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AutopilotError::BrowserLaunch(e.to_string()))?;

        Ok(Self {
            browser,
            surface: Arc::new(CdpSurface::new(page)),
            handler_task,
        })
    }

    /// The page surface for this session's single tab.
    pub fn surface(&self) -> Arc<dyn PageSurface> {
        self.surface.clone()
    }

    /// Close the browser. Called unconditionally at the end of a run,
    /// including on error paths.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "browser process wait failed");
        }
        self.handler_task.abort();
        info!("browser session closed");
    }
}
