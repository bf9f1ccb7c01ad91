//! CDP error types.

use thiserror::Error;

use webpilot_protocols::BrowserError;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to Chrome.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome not running with remote debugging.
    #[error("Chrome not available at {0}. Start Chrome with: chrome --remote-debugging-port=9222")]
    ChromeNotAvailable(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol error.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (endpoint discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ConnectionFailed(msg) | CdpError::ChromeNotAvailable(msg) => {
                BrowserError::ConnectionFailed(msg)
            }
            CdpError::WebSocket(msg) | CdpError::Http(msg) => BrowserError::ConnectionFailed(msg),
            CdpError::NavigationFailed(msg) => BrowserError::NavigationFailed(msg),
            CdpError::JavaScript(msg) => BrowserError::JavaScript(msg),
            CdpError::Timeout(msg) => BrowserError::Timeout(msg),
            CdpError::SessionClosed => BrowserError::NotConnected,
            other => BrowserError::ActionFailed(other.to_string()),
        }
    }
}
