//! Core session struct and CDP command dispatch.

use serde_json::{Value, json};
use tracing::debug;

use crate::cdp::client::Transport;
use crate::cdp::error::CdpError;
use crate::cdp::protocol::ScreenshotFormat;

/// A session attached to a single page target.
pub struct PageSession {
    pub(super) target_id: String,
    pub(super) session_id: String,
    pub(super) transport: Transport,
}

impl PageSession {
    pub(crate) fn new(target_id: String, session_id: String, transport: Transport) -> Self {
        Self {
            target_id,
            session_id,
            transport,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport
            .call(method, params, Some(&self.session_id))
            .await
    }

    /// Enable required CDP domains.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Fix the layout viewport size.
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CdpError> {
        self.call(
            "Emulation.setDeviceMetricsOverride",
            Some(json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 1,
                "mobile": false,
            })),
        )
        .await?;
        Ok(())
    }

    /// Take a screenshot; returns base64-encoded image data.
    pub async fn screenshot(&self, format: ScreenshotFormat, full_page: bool) -> Result<String, CdpError> {
        let params = json!({
            "format": format,
            "captureBeyondViewport": full_page,
        });

        let result = self.call("Page.captureScreenshot", Some(params)).await?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }
}
