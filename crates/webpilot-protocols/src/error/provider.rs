//! LLM Provider errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

impl ProviderError {
    /// Map an HTTP error status and message to the closest variant.
    pub fn from_api_response(status: u16, message: String) -> Self {
        let lower = message.to_lowercase();
        match status {
            401 | 403 => ProviderError::AuthenticationFailed(message),
            429 => ProviderError::RateLimited {
                retry_after_seconds: 60,
            },
            400 | 413
                if lower.contains("context length")
                    || lower.contains("too many tokens")
                    || lower.contains("prompt is too long") =>
            {
                ProviderError::ContextLengthExceeded(message)
            }
            400 => ProviderError::InvalidRequest(message),
            _ => ProviderError::ApiError { status, message },
        }
    }

    /// Whether a later identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Network(_)
                | ProviderError::Timeout(_)
                | ProviderError::ApiError { status: 500..=599, .. }
        )
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
