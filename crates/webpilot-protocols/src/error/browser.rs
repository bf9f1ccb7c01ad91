//! Browser driver errors.
//!
//! Display strings are part of the contract: the recovery policy routes on
//! substrings such as "not found", "not visible" and "navigation".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Browser not connected")]
    NotConnected,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element not visible: {0}")]
    ElementNotVisible(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Timeout waiting for selector: {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_recovery_keywords() {
        let not_found = BrowserError::ElementNotFound("#x".to_string()).to_string();
        assert!(not_found.to_lowercase().contains("not found"));

        let hidden = BrowserError::ElementNotVisible("#x".to_string()).to_string();
        assert!(hidden.to_lowercase().contains("not visible"));

        let nav = BrowserError::NavigationFailed("net::ERR_NAME_NOT_RESOLVED".to_string());
        assert!(nav.to_string().to_lowercase().contains("navigation"));

        let timeout = BrowserError::Timeout("#x".to_string()).to_string();
        assert!(timeout.to_lowercase().contains("timeout"));
    }

    #[test]
    fn test_not_connected() {
        assert_eq!(BrowserError::NotConnected.to_string(), "Browser not connected");
    }
}
