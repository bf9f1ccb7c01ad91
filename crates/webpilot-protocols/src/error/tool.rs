//! Tool execution errors.

use thiserror::Error;

use super::BrowserError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Parameter validation failed: {0}")]
    ValidationFailed(String),

    #[error("Tool execution timed out after {0} seconds")]
    Timeout(u64),

    #[error("Tool execution was cancelled")]
    Cancelled,

    /// Browser failures keep their own message so the recovery policy can
    /// classify them.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_not_found() {
        let err = ToolError::NotFound("click".to_string());
        assert!(err.to_string().contains("Tool not found"));
        assert!(err.to_string().contains("click"));
    }

    #[test]
    fn test_tool_error_invalid_parameters() {
        let err = ToolError::InvalidParameters("missing field `selector`".to_string());
        assert!(err.to_string().contains("Invalid parameters"));
    }

    #[test]
    fn test_tool_error_timeout() {
        let err = ToolError::Timeout(30);
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_browser_error_is_transparent() {
        let err: ToolError = BrowserError::ElementNotFound("#buy".to_string()).into();
        assert_eq!(err.to_string(), "Element not found: #buy");
    }

    #[test]
    fn test_tool_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ToolError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
