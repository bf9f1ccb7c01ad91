//! Chrome DevTools Protocol implementation of [`BrowserDriver`].

mod launcher;
mod popups;
pub mod scripts;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info};

use webpilot_protocols::{BrowserDriver, BrowserError, RawElement};

use crate::cdp::{CdpClient, PageSession, ScreenshotFormat};

pub use launcher::{chrome_args, find_chrome, is_chrome_running, launch_chrome};
pub use popups::dismiss_popups;

const READY_POLL: Duration = Duration::from_millis(100);

/// Driver settings.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub debug_port: u16,
    pub headless: bool,
    /// Readiness wait for every action.
    pub timeout_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Chrome profile directory, kept between runs for login state.
    pub user_data_dir: PathBuf,
    /// Explicit Chrome binary; searched for when absent.
    pub chrome_path: Option<PathBuf>,
    /// Pause after each action.
    pub action_delay: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            debug_port: 9222,
            headless: false,
            timeout_ms: 30_000,
            viewport_width: 1280,
            viewport_height: 900,
            user_data_dir: PathBuf::from("./profiles/default"),
            chrome_path: None,
            action_delay: Duration::from_millis(500),
        }
    }
}

impl DriverConfig {
    /// CDP HTTP endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Result of the in-page locate script.
#[derive(Debug, Deserialize)]
struct Located {
    found: bool,
    visible: bool,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct ViewportSize {
    width: f64,
    height: f64,
}

/// One Chrome page driven over CDP.
pub struct CdpDriver {
    config: DriverConfig,
    page: PageSession,
    client: CdpClient,
    chrome: Mutex<Option<Child>>,
}

impl CdpDriver {
    /// Connect to Chrome on the configured port, launching it when nothing is listening.
    pub async fn launch(config: DriverConfig) -> Result<Self, BrowserError> {
        let endpoint = config.endpoint();

        let chrome = if is_chrome_running(&endpoint).await {
            info!("Chrome already running on port {}", config.debug_port);
            None
        } else {
            info!("Chrome not running on port {}, launching...", config.debug_port);
            Some(launch_chrome(&config).await?)
        };

        let client = CdpClient::connect(&endpoint).await?;

        let existing = client
            .list_pages()
            .await?
            .into_iter()
            .find(|p| p.page_type == "page");
        let page = match existing {
            Some(info) => client.attach_page(&info.id).await?,
            None => client.new_page(None).await?,
        };
        page.set_viewport(config.viewport_width, config.viewport_height)
            .await?;

        info!("Connected to Chrome at {}", endpoint);
        Ok(Self {
            config,
            page,
            client,
            chrome: Mutex::new(chrome),
        })
    }

    /// Close the page and stop Chrome if this driver launched it.
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        if let Some(mut child) = self.chrome.lock().await.take() {
            info!("Shutting down Chrome...");
            let _ = self.client.close_page(self.page.target_id()).await;
            let _ = child.kill().await;
        }
        Ok(())
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Wait until `selector` resolves to a visible element; returns its centre.
    async fn wait_ready(&self, selector: &str) -> Result<(f64, f64), BrowserError> {
        let deadline = Instant::now() + self.config.timeout();
        let script = scripts::locate(selector);
        let mut seen = false;

        loop {
            let value = self.page.evaluate(&script).await?;
            let located: Located = serde_json::from_value(value)
                .map_err(|e| BrowserError::JavaScript(format!("locate: {}", e)))?;

            if located.found && located.visible {
                return Ok((located.x, located.y));
            }
            seen |= located.found;

            if Instant::now() >= deadline {
                return Err(if seen {
                    BrowserError::ElementNotVisible(selector.to_string())
                } else {
                    BrowserError::ElementNotFound(selector.to_string())
                });
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    async fn settle(&self) {
        if !self.config.action_delay.is_zero() {
            tokio::time::sleep(self.config.action_delay).await;
        }
    }

    async fn viewport_center(&self) -> Result<(f64, f64), BrowserError> {
        let value = self.page.evaluate(scripts::VIEWPORT_SIZE).await?;
        let size: ViewportSize = serde_json::from_value(value).unwrap_or(ViewportSize {
            width: self.config.viewport_width as f64,
            height: self.config.viewport_height as f64,
        });
        Ok((size.width / 2.0, size.height / 2.0))
    }
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.page.navigate(url, self.config.timeout()).await?;
        self.settle().await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.page.get_url().await?)
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.page.get_title().await?)
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let (x, y) = self.wait_ready(selector).await?;
        self.page.click(x, y).await?;
        debug!("Clicked {}", selector);
        self.settle().await;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, clear: bool) -> Result<(), BrowserError> {
        let (x, y) = self.wait_ready(selector).await?;
        self.page.click(x, y).await?;

        let focused = self.page.evaluate(&scripts::focus(selector, clear)).await?;
        if focused != Value::Bool(true) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }

        self.page.insert_text(text).await?;
        self.settle().await;
        Ok(())
    }

    async fn press_key(&self, keys: &str) -> Result<(), BrowserError> {
        self.page.press_key_combo(keys).await?;
        self.settle().await;
        Ok(())
    }

    async fn scroll(&self, delta_y: i64) -> Result<(), BrowserError> {
        let (x, y) = self.viewport_center().await?;
        self.page.scroll(x, y, 0.0, delta_y as f64).await?;
        self.settle().await;
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), BrowserError> {
        let (x, y) = self.wait_ready(selector).await?;
        self.page.mouse_move(x, y).await?;
        self.settle().await;
        Ok(())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        self.page.go_back(self.config.timeout()).await?;
        self.settle().await;
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), BrowserError> {
        let data = self
            .page
            .screenshot(ScreenshotFormat::Png, full_page)
            .await
            .map_err(|e| BrowserError::Screenshot(e.to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| BrowserError::Screenshot(e.to_string()))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        debug!("Screenshot saved to {}", path.display());
        Ok(())
    }

    async fn visible_text(&self, max_len: usize) -> Result<String, BrowserError> {
        let value = self.page.evaluate(&scripts::visible_text(max_len)).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn interactive_elements(&self) -> Result<Vec<RawElement>, BrowserError> {
        let value = self.page.evaluate(scripts::ENUMERATE_ELEMENTS).await?;
        serde_json::from_value(value)
            .map_err(|e| BrowserError::JavaScript(format!("element enumeration: {}", e)))
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        Ok(self.page.evaluate(expression).await?)
    }

    async fn close_popups(&self) -> Result<bool, BrowserError> {
        dismiss_popups(self).await
    }
}
