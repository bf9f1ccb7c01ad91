//! Navigation operations for CDP page session.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;

use super::core::PageSession;

impl PageSession {
    /// Navigate to URL and wait for the document to load.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error) = result.get("errorText").and_then(|e| e.as_str()) {
            return Err(CdpError::NavigationFailed(format!("{} ({})", url, error)));
        }

        self.wait_for_load(timeout).await?;

        debug!("Navigated to {}", url);
        Ok(())
    }

    /// Poll `document.readyState` until the page is usable.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        let start = Instant::now();

        loop {
            // Evaluation can fail briefly while the old context is torn down.
            if let Ok(result) = self.evaluate("document.readyState").await {
                if matches!(result.as_str(), Some("complete") | Some("interactive")) {
                    return Ok(());
                }
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("Page load timeout".to_string()));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Go back one history entry; a no-op at the start of history.
    pub async fn go_back(&self, timeout: Duration) -> Result<(), CdpError> {
        let history = self.call("Page.getNavigationHistory", None).await?;
        let current_index = history["currentIndex"].as_i64().unwrap_or(0);

        if current_index <= 0 {
            return Ok(());
        }

        let entry_id = history["entries"]
            .as_array()
            .and_then(|entries| entries.get((current_index - 1) as usize))
            .and_then(|entry| entry["id"].as_i64());

        if let Some(entry_id) = entry_id {
            self.call(
                "Page.navigateToHistoryEntry",
                Some(json!({"entryId": entry_id})),
            )
            .await?;
            self.wait_for_load(timeout).await?;
        }
        Ok(())
    }

    pub async fn get_url(&self) -> Result<String, CdpError> {
        let result = self.evaluate("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    pub async fn get_title(&self) -> Result<String, CdpError> {
        let result = self.evaluate("document.title").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }
}
