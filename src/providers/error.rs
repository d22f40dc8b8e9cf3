//! Error types for language-model provider operations
//!
//! Errors are categorized so callers can tell transient upstream trouble from
//! problems that need operator attention.

use thiserror::Error;

/// Errors that can occur when interacting with LLM providers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network-related errors (connection issues, DNS failures)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Authentication errors (invalid API key, unauthorized access)
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Rate limit errors (too many requests, quota exceeded)
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        /// Optional retry-after duration in seconds
        retry_after: Option<u64>,
    },

    /// Invalid request errors (bad parameters, malformed input)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Request took too long
    #[error("Request timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The model refused the prompt (safety filters)
    #[error("Prompt blocked by provider: {reason}")]
    Blocked { reason: String },

    /// Errors reported by the LLM service itself
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        /// Optional error code from provider
        code: Option<String>,
    },

    /// Serialization/deserialization errors (malformed response)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration errors (missing API key, invalid settings)
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ProviderError {
    /// Returns true if this error is potentially transient
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network { .. }
                | ProviderError::RateLimit { .. }
                | ProviderError::Timeout { .. }
        )
    }

    /// Returns true if this error indicates an authentication problem
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ProviderError::Auth { .. })
    }

    /// Returns true if this error indicates a rate limit
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimit { .. })
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::Blocked {
            reason: reason.into(),
        }
    }

    pub fn provider(message: impl Into<String>, code: Option<impl Into<String>>) -> Self {
        Self::Provider {
            message: message.into(),
            code: code.map(|c| c.into()),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Network {
                message: format!("Connection failed: {}", err),
            }
        } else if err.is_decode() {
            Self::Serialization {
                message: format!("Failed to parse response: {}", err),
            }
        } else {
            Self::Network {
                message: format!("Request failed: {}", err),
            }
        }
    }
}
