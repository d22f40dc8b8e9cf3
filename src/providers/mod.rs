//! Language-model provider module for voicetutor
//!
//! This module defines the trait and types used to talk to a conversational
//! language model. The session layer owns the conversation state (system
//! instruction plus turn history) and hands the whole of it to the provider on
//! every turn, so providers stay stateless.
//!
//! # Architecture
//!
//! - `LlmProvider` trait defines the interface all providers must implement
//! - `GeminiProvider` talks to the Gemini `generateContent` REST endpoint
//! - `ProviderFactory` creates the appropriate provider based on configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use voicetutor::providers::{LlmMessage, LlmProvider};
//!
//! async fn example(provider: &dyn LlmProvider) {
//!     let history = vec![LlmMessage::user("Hello!")];
//!     let response = provider
//!         .chat("You are a helpful tutor.", &history, "gemini-2.5-flash-lite")
//!         .await
//!         .unwrap();
//!     println!("Response: {}", response.content);
//! }
//! ```

use bytes::Bytes;
use std::fmt;

pub mod error;
pub mod factory;
pub mod gemini;
#[cfg(test)]
pub mod mock;

pub use error::ProviderError;
pub use factory::{GeminiConfig, ProviderConfig, ProviderFactory};
pub use gemini::GeminiProvider;

/// Role of a message sender in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    /// User input
    User,
    /// Model response
    Assistant,
}

impl LlmRole {
    /// Returns the string representation of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmRole::User => "user",
            LlmRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for LlmRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image attached to a user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// MIME type, e.g. `image/jpeg`
    pub mime_type: String,
    /// Raw image bytes
    pub data: Bytes,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// Represents one turn in the conversation history
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMessage {
    /// Role of the message sender
    pub role: LlmRole,
    /// Text content of the message
    pub content: String,
    /// Optional image sent together with the text (user turns only)
    pub image: Option<InlineImage>,
}

impl LlmMessage {
    /// Creates a new message with the specified role and content
    pub fn new(role: LlmRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            image: None,
        }
    }

    /// Creates a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(LlmRole::User, content)
    }

    /// Creates an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(LlmRole::Assistant, content)
    }

    /// Attaches an image, making this a multimodal turn
    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn is_user(&self) -> bool {
        matches!(self.role, LlmRole::User)
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self.role, LlmRole::Assistant)
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Response from the LLM provider
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LlmResponse {
    /// Text of the model's reply; may be empty
    pub content: String,
    /// Number of tokens in the prompt (if provided by provider)
    pub prompt_tokens: Option<u32>,
    /// Number of tokens in the completion (if provided by provider)
    pub completion_tokens: Option<u32>,
}

impl LlmResponse {
    /// Creates a new response with just content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    /// Adds token usage information
    pub fn with_tokens(mut self, prompt: u32, completion: u32) -> Self {
        self.prompt_tokens = Some(prompt);
        self.completion_tokens = Some(completion);
        self
    }

    /// Returns true if the model produced no text
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Returns the total token count if available
    pub fn total_tokens(&self) -> Option<u32> {
        match (self.prompt_tokens, self.completion_tokens) {
            (Some(p), Some(c)) => Some(p + c),
            _ => None,
        }
    }
}

/// Trait for language-model providers
///
/// All implementations must be Send + Sync to allow concurrent usage across
/// request handlers. A call issues exactly one upstream request; retry policy
/// belongs to the caller.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Runs one turn of the conversation
    ///
    /// # Arguments
    ///
    /// * `system_instruction` - Fixed instruction the conversation was created with
    /// * `messages` - Full turn history, ending with the new user turn
    /// * `model` - Model name to use for this request
    async fn chat(
        &self,
        system_instruction: &str,
        messages: &[LlmMessage],
        model: &str,
    ) -> Result<LlmResponse, ProviderError>;

    /// Returns the default model for this provider
    fn default_model(&self) -> String;

    /// Returns the provider name, used for logging
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed LlmProvider trait object
pub type BoxedProvider = Box<dyn LlmProvider>;
