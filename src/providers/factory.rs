//! Provider factory for creating LLM provider instances
//!
//! This module provides a factory pattern for creating provider instances based on configuration.
//! It handles configuration validation before any client is built.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::providers::{BoxedProvider, GeminiProvider, ProviderError};

/// Configuration for the Gemini provider
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct GeminiConfig {
    /// API key for the Generative Language API
    #[serde(default)]
    pub api_key: String,
    /// Base URL for the models endpoint
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Default model to use
    #[serde(default = "default_gemini_model")]
    pub default_model: String,
    /// HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl GeminiConfig {
    /// Creates a new Gemini configuration with the required API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_gemini_base_url(),
            default_model: default_gemini_model(),
            timeout_seconds: default_timeout(),
        }
    }

    /// Sets a custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Sets the timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Returns true when an API key is present
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        if !self.has_api_key() {
            return Err(ProviderError::config("Gemini API key is required"));
        }

        if self.base_url.is_empty() {
            return Err(ProviderError::config("Gemini base URL cannot be empty"));
        }

        if self.default_model.is_empty() {
            return Err(ProviderError::config("Gemini default model cannot be empty"));
        }

        if self.timeout_seconds == 0 {
            return Err(ProviderError::config("Gemini timeout must be at least 1 second"));
        }

        Ok(())
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// Provider configuration variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Google Gemini configuration
    Gemini(GeminiConfig),
    /// Mock provider for testing (only available in test builds)
    #[cfg(test)]
    Mock,
}

impl ProviderConfig {
    /// Returns the provider type name
    pub fn provider_type(&self) -> &'static str {
        match self {
            ProviderConfig::Gemini(_) => "gemini",
            #[cfg(test)]
            ProviderConfig::Mock => "mock",
        }
    }

    /// Returns the default model of this configuration
    pub fn default_model(&self) -> &str {
        match self {
            ProviderConfig::Gemini(config) => &config.default_model,
            #[cfg(test)]
            ProviderConfig::Mock => "mock-model",
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        match self {
            ProviderConfig::Gemini(config) => config.validate(),
            #[cfg(test)]
            ProviderConfig::Mock => Ok(()),
        }
    }

    /// Creates a Gemini configuration
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::Gemini(GeminiConfig::new(api_key))
    }

    #[cfg(test)]
    /// Creates a mock configuration
    pub fn mock() -> Self {
        Self::Mock
    }
}

/// Factory for creating LLM provider instances
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates a provider instance from configuration
    ///
    /// Validates the configuration first and fails with `ProviderError::Config`
    /// if anything required is missing.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use voicetutor::providers::{LlmProvider, ProviderConfig, ProviderFactory};
    ///
    /// let provider = ProviderFactory::create(ProviderConfig::gemini("api-key")).unwrap();
    /// assert_eq!(provider.provider_name(), "gemini");
    /// ```
    pub fn create(config: ProviderConfig) -> Result<BoxedProvider, ProviderError> {
        config.validate()?;

        match config {
            ProviderConfig::Gemini(gemini) => {
                tracing::debug!(model = %gemini.default_model, "Creating Gemini provider");
                Ok(Box::new(GeminiProvider::try_from_config(&gemini)?))
            }
            #[cfg(test)]
            ProviderConfig::Mock => Ok(Box::new(crate::providers::mock::MockLlmProvider::new())),
        }
    }
}
