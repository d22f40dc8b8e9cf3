//! Google Cloud Speech-to-Text client (`speech:recognize`)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::speech::{AudioHints, SpeechConfig, SpeechError, SpeechToText};

#[derive(Debug, Serialize)]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
    language_code: String,
    enable_automatic_punctuation: bool,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
}

/// Speech-to-Text REST client
#[derive(Debug, Clone)]
pub struct GoogleSpeechClient {
    api_key: String,
    base_url: String,
    timeout_seconds: u64,
    client: Client,
}

impl GoogleSpeechClient {
    pub fn try_from_config(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SpeechError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.stt_base_url.trim_end_matches('/').to_string(),
            timeout_seconds: config.timeout_seconds,
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/speech:recognize", self.base_url)
    }

    fn build_request(audio: &[u8], hints: AudioHints, language: &str) -> RecognizeRequest {
        RecognizeRequest {
            config: RecognitionConfig {
                encoding: hints.encoding.as_api_str(),
                sample_rate_hertz: hints.sample_rate_hertz,
                language_code: language.to_string(),
                enable_automatic_punctuation: true,
            },
            audio: RecognitionAudio {
                content: BASE64.encode(audio),
            },
        }
    }

    /// First alternative of every result, trimmed and space-joined; blank ones are skipped
    fn join_transcripts(response: RecognizeResponse) -> String {
        response
            .results
            .into_iter()
            .filter_map(|result| result.alternatives.into_iter().next())
            .map(|alternative| alternative.transcript.trim().to_string())
            .filter(|transcript| !transcript.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Transcribes an audio file, optionally writing a non-empty transcript
    /// to `output` as UTF-8
    pub async fn transcribe_file(
        &self,
        path: &Path,
        hints: AudioHints,
        language: &str,
        output: Option<&Path>,
    ) -> Result<String, SpeechError> {
        let audio = tokio::fs::read(path)
            .await
            .map_err(|e| SpeechError::io(path, &e))?;

        let transcript = self.transcribe(&audio, hints, language).await?;

        if transcript.is_empty() {
            info!(path = %path.display(), "No speech detected");
        } else if let Some(output) = output {
            tokio::fs::write(output, transcript.as_bytes())
                .await
                .map_err(|e| SpeechError::io(output, &e))?;
            info!(output = %output.display(), "Transcript saved");
        }

        Ok(transcript)
    }
}

#[async_trait]
impl SpeechToText for GoogleSpeechClient {
    async fn transcribe(
        &self,
        audio: &[u8],
        hints: AudioHints,
        language: &str,
    ) -> Result<String, SpeechError> {
        let request = Self::build_request(audio, hints, language);

        debug!(
            bytes = audio.len(),
            encoding = %hints.encoding,
            sample_rate = ?hints.sample_rate_hertz,
            language = language,
            "Sending recognize request"
        );

        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Speech-to-Text request failed");
                if e.is_timeout() {
                    SpeechError::timeout(self.timeout_seconds)
                } else {
                    SpeechError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Speech-to-Text returned an error status");
            return Err(SpeechError::api(status.as_u16(), body));
        }

        // An empty JSON object means no speech was recognized
        let body: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::serialization(format!("Failed to parse response: {}", e)))?;

        let transcript = Self::join_transcripts(body);
        info!(chars = transcript.chars().count(), "Transcription complete");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::AudioEncoding;

    #[test]
    fn test_request_includes_rate_only_when_hinted() {
        let wav = GoogleSpeechClient::build_request(b"abc", AudioHints::wav(), "bn-BD");
        let json = serde_json::to_value(&wav).unwrap();
        assert_eq!(json["config"]["encoding"], "LINEAR16");
        assert_eq!(json["config"]["sampleRateHertz"], 16000);
        assert_eq!(json["config"]["languageCode"], "bn-BD");
        assert_eq!(json["config"]["enableAutomaticPunctuation"], true);
        assert_eq!(json["audio"]["content"], "YWJj");

        let webm = GoogleSpeechClient::build_request(b"abc", AudioHints::webm(), "en-US");
        let json = serde_json::to_value(&webm).unwrap();
        assert_eq!(json["config"]["encoding"], "WEBM_OPUS");
        assert!(json["config"].get("sampleRateHertz").is_none());
    }

    #[test]
    fn test_custom_rate_hint() {
        let hints = AudioHints::new(AudioEncoding::Linear16, Some(44_100));
        let json = serde_json::to_value(GoogleSpeechClient::build_request(b"", hints, "en-US")).unwrap();
        assert_eq!(json["config"]["sampleRateHertz"], 44100);
    }

    #[test]
    fn test_join_transcripts() {
        let body = r#"{
            "results": [
                { "alternatives": [ { "transcript": "hello", "confidence": 0.9 }, { "transcript": "yellow" } ] },
                { "alternatives": [] },
                { "alternatives": [ { "transcript": " world " } ] }
            ]
        }"#;
        let response: RecognizeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(GoogleSpeechClient::join_transcripts(response), "hello world");
    }

    #[test]
    fn test_join_transcripts_skips_empty_alternatives() {
        let body = r#"{
            "results": [
                { "alternatives": [ { "transcript": "hello" } ] },
                { "alternatives": [ { "transcript": "" } ] },
                { "alternatives": [ { "transcript": "   " } ] },
                { "alternatives": [ { "transcript": "world" } ] }
            ]
        }"#;
        let response: RecognizeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(GoogleSpeechClient::join_transcripts(response), "hello world");
    }

    #[test]
    fn test_empty_response_is_no_speech() {
        let response: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(GoogleSpeechClient::join_transcripts(response), "");
    }

    #[test]
    fn test_api_url() {
        let mut config = SpeechConfig::new("key");
        config.stt_base_url = "http://localhost:8080/v1/".to_string();
        let client = GoogleSpeechClient::try_from_config(&config).unwrap();
        assert_eq!(client.api_url(), "http://localhost:8080/v1/speech:recognize");
    }

    #[tokio::test]
    async fn test_transcribe_missing_file() {
        let client = GoogleSpeechClient::try_from_config(&SpeechConfig::new("key")).unwrap();
        let err = client
            .transcribe_file(Path::new("/nonexistent/clip.wav"), AudioHints::wav(), "bn-BD", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Io { .. }));
    }
}
