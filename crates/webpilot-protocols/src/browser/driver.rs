//! Browser driver trait.

use std::path::Path;

use async_trait::async_trait;

use super::RawElement;
use crate::error::BrowserError;

/// Primitive browser operations used by tools and the agent loop.
///
/// Every action is bounded by a driver-level timeout; timeouts surface as
/// [`BrowserError::Timeout`] and are never retried here.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Type into the element, optionally clearing it first.
    async fn type_text(&self, selector: &str, text: &str, clear: bool) -> Result<(), BrowserError>;

    /// Press a key or chord such as `Enter` or `Control+A`.
    async fn press_key(&self, keys: &str) -> Result<(), BrowserError>;

    /// Scroll vertically; negative values scroll up.
    async fn scroll(&self, delta_y: i64) -> Result<(), BrowserError>;

    async fn hover(&self, selector: &str) -> Result<(), BrowserError>;

    async fn go_back(&self) -> Result<(), BrowserError>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), BrowserError>;

    /// Visible page text, cut to `max_len` characters.
    async fn visible_text(&self, max_len: usize) -> Result<String, BrowserError>;

    /// Enumerate visible interactive elements, unscored and in document order.
    async fn interactive_elements(&self) -> Result<Vec<RawElement>, BrowserError>;

    /// Evaluate an expression in the page and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, BrowserError>;

    /// Best-effort dismissal of overlays; returns whether anything was closed.
    async fn close_popups(&self) -> Result<bool, BrowserError>;
}
