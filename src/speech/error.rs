//! Error types for the speech adapters

use std::path::PathBuf;
use thiserror::Error;

/// Speech-to-text and text-to-speech errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeechError {
    /// Connection refused, DNS failure, reset
    #[error("Network error: {message}")]
    Network { message: String },

    /// The service rejected the request with a non-success status
    #[error("Speech API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request exceeded the configured timeout
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Response body could not be decoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Reading audio or writing output failed
    #[error("IO error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Missing key or unusable client settings
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl SpeechError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the service rejected the credentials
    pub fn is_auth_error(&self) -> bool {
        match self {
            SpeechError::Api { status, message } => {
                matches!(status, 401 | 403)
                    || (*status == 400 && message.contains("API key not valid"))
            }
            _ => false,
        }
    }

    /// Returns true if a later identical request might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SpeechError::Network { .. } | SpeechError::Timeout { .. } => true,
            SpeechError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SpeechError::serialization(err.to_string())
        } else {
            SpeechError::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SpeechError {
    fn from(err: serde_json::Error) -> Self {
        SpeechError::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_detection() {
        assert!(SpeechError::api(401, "unauthorized").is_auth_error());
        assert!(SpeechError::api(403, "forbidden").is_auth_error());
        assert!(SpeechError::api(400, "API key not valid. Please pass a valid API key.").is_auth_error());
        assert!(!SpeechError::api(400, "Invalid recognition config").is_auth_error());
        assert!(!SpeechError::network("down").is_auth_error());
    }

    #[test]
    fn test_retryable() {
        assert!(SpeechError::network("reset").is_retryable());
        assert!(SpeechError::timeout(30).is_retryable());
        assert!(SpeechError::api(503, "unavailable").is_retryable());
        assert!(SpeechError::api(429, "quota").is_retryable());
        assert!(!SpeechError::api(400, "bad").is_retryable());
        assert!(!SpeechError::serialization("x").is_retryable());
    }

    #[test]
    fn test_display() {
        let err = SpeechError::api(500, "internal");
        assert_eq!(err.to_string(), "Speech API error (500): internal");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = SpeechError::io("/tmp/a.wav", &io);
        assert!(err.to_string().contains("/tmp/a.wav"));
    }
}
