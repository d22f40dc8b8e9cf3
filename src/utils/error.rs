//! Centralized error types and conversions for voicetutor
//!
//! Library code returns [`VoiceError`]; the binary and CLI wrap it with `anyhow`
//! for context. Upstream failures keep the stage they came from so callers can
//! pick the user-facing message.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::lessons::LessonError;
use crate::providers::ProviderError;
use crate::session::PromptError;
use crate::speech::SpeechError;

/// Pipeline stage an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcription,
    Generation,
    Synthesis,
    Lessons,
    Config,
    Input,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transcription => "transcription",
            Stage::Generation => "generation",
            Stage::Synthesis => "synthesis",
            Stage::Lessons => "lessons",
            Stage::Config => "config",
            Stage::Input => "input",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global error type for voicetutor operations
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Startup-class failures (missing prompt template, bad config file)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Speech-to-text call failed
    #[error("Speech-to-text failed: {source}")]
    Transcription {
        #[source]
        source: SpeechError,
    },

    /// Language-model turn failed
    #[error("Language model call failed: {source}")]
    Generation {
        #[source]
        source: ProviderError,
    },

    /// Text-to-speech call failed
    #[error("Text-to-speech failed: {source}")]
    Synthesis {
        #[source]
        source: SpeechError,
    },

    /// Unknown lesson, missing content file or missing quiz
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Invalid caller input (empty audio, malformed topic id)
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// IO errors with path context
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl VoiceError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn transcription(source: SpeechError) -> Self {
        Self::Transcription { source }
    }

    pub fn generation(source: ProviderError) -> Self {
        Self::Generation { source }
    }

    pub fn synthesis(source: SpeechError) -> Self {
        Self::Synthesis { source }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns the stage this error is attributed to
    pub fn stage(&self) -> Stage {
        match self {
            VoiceError::Config { .. } => Stage::Config,
            VoiceError::Transcription { .. } => Stage::Transcription,
            VoiceError::Generation { .. } => Stage::Generation,
            VoiceError::Synthesis { .. } => Stage::Synthesis,
            VoiceError::NotFound { .. } => Stage::Lessons,
            VoiceError::InvalidInput { .. } => Stage::Input,
            VoiceError::Io { .. } => Stage::Lessons,
            VoiceError::Serialization { .. } => Stage::Lessons,
        }
    }

    /// Returns true if the caller can reasonably try the request again
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Upstream services might succeed on a later request
            VoiceError::Transcription { source } | VoiceError::Synthesis { source } => {
                source.is_retryable()
            }
            VoiceError::Generation { source } => source.is_retryable(),
            // The user can fix their input
            VoiceError::InvalidInput { .. } => true,
            VoiceError::NotFound { .. } => true,
            VoiceError::Io { .. } => true,
            VoiceError::Serialization { .. } => false,
            // Fatal at startup
            VoiceError::Config { .. } => false,
        }
    }

    /// Returns the error severity level for logging
    pub fn severity(&self) -> tracing::Level {
        match self {
            VoiceError::Config { .. } => tracing::Level::ERROR,
            VoiceError::Serialization { .. } => tracing::Level::ERROR,
            VoiceError::Transcription { .. } => tracing::Level::WARN,
            VoiceError::Generation { .. } => tracing::Level::WARN,
            VoiceError::Synthesis { .. } => tracing::Level::WARN,
            VoiceError::Io { .. } => tracing::Level::WARN,
            VoiceError::NotFound { .. } => tracing::Level::INFO,
            VoiceError::InvalidInput { .. } => tracing::Level::INFO,
        }
    }

    /// Returns a hint for the person running the service, if one applies
    pub fn suggestion(&self) -> Option<String> {
        match self {
            VoiceError::Config { .. } => Some(
                "Check ~/.voicetutor/config.json, the prompts file and environment variables."
                    .to_string(),
            ),
            VoiceError::Generation { source } if source.is_auth_error() => {
                Some("Verify GEMINI_API_KEY or gemini.api_key in the config file.".to_string())
            }
            VoiceError::Transcription { source } | VoiceError::Synthesis { source }
                if source.is_auth_error() =>
            {
                Some("Verify GOOGLE_API_KEY or speech.api_key in the config file.".to_string())
            }
            VoiceError::NotFound { .. } => {
                Some("Run 'voicetutor lessons' to see available topics.".to_string())
            }
            _ => None,
        }
    }
}

/// Result type alias using VoiceError
pub type Result<T> = std::result::Result<T, VoiceError>;

impl From<PromptError> for VoiceError {
    fn from(err: PromptError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

impl From<LessonError> for VoiceError {
    fn from(err: LessonError) -> Self {
        match err {
            LessonError::TopicNotFound(topic) => Self::not_found(format!("lesson '{}'", topic)),
            LessonError::ContentNotFound(topic) => {
                Self::not_found(format!("content for lesson '{}'", topic))
            }
            LessonError::QuizNotFound(topic) => {
                Self::not_found(format!("quiz for lesson '{}'", topic))
            }
            LessonError::InvalidTopic(topic) => {
                Self::invalid_input(format!("invalid topic id '{}'", topic))
            }
            LessonError::Read(path, source) => Self::io(path, source),
            LessonError::Parse(path, source) => {
                Self::serialization(format!("{}: {}", path.display(), source))
            }
        }
    }
}

impl From<serde_json::Error> for VoiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
