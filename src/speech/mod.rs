//! Speech adapters
//!
//! `SpeechToText` and `TextToSpeech` are the narrow contracts the voice
//! pipeline depends on. The Google Cloud REST clients in [`stt`] and [`tts`]
//! implement them; tests substitute their own fakes.

pub mod error;
pub mod stt;
pub mod tts;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use error::SpeechError;
pub use stt::GoogleSpeechClient;
pub use tts::GoogleTtsClient;

/// Encoding hint passed to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioEncoding {
    /// 16-bit signed little-endian PCM (WAV)
    Linear16,
    /// Opus in a WebM container; the rate is read from the header
    WebmOpus,
    /// Let the service detect the format
    #[default]
    Unspecified,
}

impl AudioEncoding {
    /// Wire name used by the Speech-to-Text API
    pub fn as_api_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "LINEAR16",
            AudioEncoding::WebmOpus => "WEBM_OPUS",
            AudioEncoding::Unspecified => "ENCODING_UNSPECIFIED",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Encoding and sample-rate hints for one recognition request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioHints {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: Option<u32>,
}

impl AudioHints {
    pub const WAV_SAMPLE_RATE: u32 = 16_000;

    pub fn new(encoding: AudioEncoding, sample_rate_hertz: Option<u32>) -> Self {
        Self {
            encoding,
            sample_rate_hertz,
        }
    }

    /// No hints; the service auto-detects
    pub fn auto() -> Self {
        Self::default()
    }

    /// 16 kHz LINEAR16
    pub fn wav() -> Self {
        Self::new(AudioEncoding::Linear16, Some(Self::WAV_SAMPLE_RATE))
    }

    /// WEBM_OPUS without a rate
    pub fn webm() -> Self {
        Self::new(AudioEncoding::WebmOpus, None)
    }

    /// Derives hints from an upload's filename extension, else its content type
    ///
    /// A filename always wins when present, even if its extension is unknown.
    pub fn detect(filename: Option<&str>, content_type: Option<&str>) -> Self {
        let format = match (filename, content_type) {
            (Some(name), _) if !name.is_empty() => name
                .rsplit('.')
                .next()
                .map(str::to_ascii_lowercase)
                .unwrap_or_default(),
            (_, Some(mime)) if mime.contains("webm") => "webm".to_string(),
            (_, Some(mime)) if mime.contains("wav") => "wav".to_string(),
            _ => String::new(),
        };

        match format.as_str() {
            "webm" => Self::webm(),
            "wav" => Self::wav(),
            _ => Self::auto(),
        }
    }
}

/// Speech-to-text contract
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribes `audio`; returns an empty string when no speech was found
    async fn transcribe(
        &self,
        audio: &[u8],
        hints: AudioHints,
        language: &str,
    ) -> Result<String, SpeechError>;
}

/// Text-to-speech contract; output is always LINEAR16 audio
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, SpeechError>;
}

/// Settings shared by the Google speech clients
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_stt_base_url")]
    pub stt_base_url: String,
    #[serde(default = "default_tts_base_url")]
    pub tts_base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_stt_base_url() -> String {
    "https://speech.googleapis.com/v1".to_string()
}

fn default_tts_base_url() -> String {
    "https://texttospeech.googleapis.com/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &"[REDACTED]")
            .field("stt_base_url", &self.stt_base_url)
            .field("tts_base_url", &self.tts_base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl SpeechConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            stt_base_url: default_stt_base_url(),
            tts_base_url: default_tts_base_url(),
            timeout_seconds: default_timeout(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), SpeechError> {
        if !self.has_api_key() {
            return Err(SpeechError::config("Google speech API key is required"));
        }
        if self.timeout_seconds == 0 {
            return Err(SpeechError::config("Speech timeout must be at least 1 second"));
        }
        Ok(())
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}
