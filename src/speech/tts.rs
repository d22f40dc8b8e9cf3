//! Google Cloud Text-to-Speech client (`text:synthesize`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::speech::{SpeechConfig, SpeechError, TextToSpeech};

pub const DEFAULT_OUTPUT_FILE: &str = "output.wav";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest {
    input: SynthesisInput,
    voice: VoiceSelection,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    language_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

/// Text-to-Speech REST client; voices are picked by language code only
#[derive(Debug, Clone)]
pub struct GoogleTtsClient {
    api_key: String,
    base_url: String,
    timeout_seconds: u64,
    client: Client,
}

impl GoogleTtsClient {
    pub fn try_from_config(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SpeechError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.tts_base_url.trim_end_matches('/').to_string(),
            timeout_seconds: config.timeout_seconds,
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/text:synthesize", self.base_url)
    }

    fn build_request(text: &str, language: &str) -> SynthesizeRequest {
        SynthesizeRequest {
            input: SynthesisInput {
                text: text.to_string(),
            },
            voice: VoiceSelection {
                language_code: language.to_string(),
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
            },
        }
    }

    fn decode_audio(response: SynthesizeResponse) -> Result<Bytes, SpeechError> {
        BASE64
            .decode(response.audio_content.as_bytes())
            .map(Bytes::from)
            .map_err(|e| SpeechError::serialization(format!("Invalid audioContent: {}", e)))
    }

    /// Synthesizes `text` and writes the audio to `output` (`output.wav` when
    /// absent). Returns the path written.
    pub async fn synthesize_to_file(
        &self,
        text: &str,
        language: &str,
        output: Option<&Path>,
    ) -> Result<PathBuf, SpeechError> {
        let audio = self.synthesize(text, language).await?;
        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));

        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| SpeechError::io(&path, &e))?;

        info!(path = %path.display(), bytes = audio.len(), "Audio saved");
        Ok(path)
    }
}

#[async_trait]
impl TextToSpeech for GoogleTtsClient {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, SpeechError> {
        let request = Self::build_request(text, language);

        debug!(
            chars = text.chars().count(),
            language = language,
            "Sending synthesize request"
        );

        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Text-to-Speech request failed");
                if e.is_timeout() {
                    SpeechError::timeout(self.timeout_seconds)
                } else {
                    SpeechError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Text-to-Speech returned an error status");
            return Err(SpeechError::api(status.as_u16(), body));
        }

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::serialization(format!("Failed to parse response: {}", e)))?;

        let audio = Self::decode_audio(body)?;
        info!(bytes = audio.len(), "Synthesis complete");
        Ok(audio)
    }
}
