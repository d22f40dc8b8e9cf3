//! Gemini provider implementation
//!
//! Implements `LlmProvider` on top of the Gemini `generateContent` REST
//! endpoint. The system instruction travels in `systemInstruction`, turn
//! history in `contents` (roles `user` / `model`), and images as `inlineData`
//! parts placed before the text of the same turn.
//!
//! Each `chat` call issues exactly one HTTP request. Failures are classified
//! into `ProviderError` and returned to the caller without retrying.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::providers::factory::GeminiConfig;
use crate::providers::{LlmMessage, LlmProvider, LlmResponse, LlmRole, ProviderError};

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
}

/// A content block (one turn, or the system instruction)
#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiContent {
    /// `user` or `model`; absent for the system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    /// Base64-encoded bytes
    data: String,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Gemini language-model provider
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    default_model: String,
    timeout_seconds: u64,
    client: Client,
}

impl GeminiProvider {
    /// Creates a provider from configuration, failing if the HTTP client cannot be built
    pub fn try_from_config(config: &GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.default_model.clone(),
            timeout_seconds: config.timeout_seconds,
            client,
        })
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Builds the request body from the instruction and turn history
    fn build_request(
        &self,
        system_instruction: &str,
        messages: &[LlmMessage],
    ) -> GenerateContentRequest {
        let system_instruction = if system_instruction.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(system_instruction.to_string()),
                    inline_data: None,
                }],
            })
        };

        let contents = messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    LlmRole::User => "user",
                    LlmRole::Assistant => "model",
                };

                let mut parts = Vec::with_capacity(2);
                if let Some(image) = &msg.image {
                    parts.push(GeminiPart {
                        text: None,
                        inline_data: Some(GeminiInlineData {
                            mime_type: image.mime_type.clone(),
                            data: BASE64.encode(&image.data),
                        }),
                    });
                }
                parts.push(GeminiPart {
                    text: Some(msg.content.clone()),
                    inline_data: None,
                });

                GeminiContent {
                    role: Some(role.to_string()),
                    parts,
                }
            })
            .collect();

        GenerateContentRequest {
            system_instruction,
            contents,
        }
    }

    /// Extracts reply text and usage; an absent candidate is an empty reply
    fn parse_response(&self, response: GenerateContentResponse) -> Result<LlmResponse, ProviderError> {
        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(ProviderError::blocked(reason));
        }

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let mut llm_response = LlmResponse::new(content);
        if let Some(usage) = response.usage_metadata {
            llm_response = llm_response.with_tokens(usage.prompt_token_count, usage.candidates_token_count);
        }

        Ok(llm_response)
    }

    /// Maps a non-success HTTP status and body to a ProviderError
    fn classify_status(status: StatusCode, body: &str) -> ProviderError {
        let (message, code) = match serde_json::from_str::<GeminiErrorEnvelope>(body) {
            Ok(envelope) => (envelope.error.message, envelope.error.status),
            Err(_) => (body.to_string(), None),
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::auth(format!("Authentication failed ({}): {}", status, message))
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limit(message, None),
            // Gemini reports an invalid key as 400 INVALID_ARGUMENT
            StatusCode::BAD_REQUEST if message.contains("API key not valid") => {
                ProviderError::auth(message)
            }
            status if status.is_client_error() => {
                ProviderError::invalid_request(format!("Client error ({}): {}", status, message))
            }
            _ => ProviderError::provider(
                format!("Server error ({}): {}", status, message),
                Some(code.unwrap_or_else(|| status.as_u16().to_string())),
            ),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(
        &self,
        system_instruction: &str,
        messages: &[LlmMessage],
        model: &str,
    ) -> Result<LlmResponse, ProviderError> {
        let request = self.build_request(system_instruction, messages);
        let url = self.api_url(model);

        debug!(
            model = model,
            turn_count = request.contents.len(),
            has_image = messages.last().map(|m| m.has_image()).unwrap_or(false),
            "Sending generateContent request (headers omitted for security)"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Gemini request failed");
                if e.is_timeout() {
                    ProviderError::timeout(self.timeout_seconds)
                } else {
                    ProviderError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Self::classify_status(status, &body);
            error!(status = %status, error = %err, "Gemini returned an error status");
            return Err(err);
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            ProviderError::serialization(format!("Failed to parse response: {}", e))
        })?;

        let llm_response = self.parse_response(body)?;

        info!(
            model = model,
            content_length = llm_response.content.len(),
            prompt_tokens = ?llm_response.prompt_tokens,
            completion_tokens = ?llm_response.completion_tokens,
            "Received response from gemini"
        );

        Ok(llm_response)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::InlineImage;

    fn create_test_provider() -> GeminiProvider {
        GeminiProvider::try_from_config(&GeminiConfig::new("test-api-key")).unwrap()
    }

    #[test]
    fn test_api_url() {
        let provider = GeminiProvider::try_from_config(
            &GeminiConfig::new("k").with_base_url("http://localhost:8080/v1beta/"),
        )
        .unwrap();
        assert_eq!(
            provider.api_url("gemini-2.5-flash-lite"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_build_request_roles_and_instruction() {
        let provider = create_test_provider();
        let history = vec![
            LlmMessage::user("Hello"),
            LlmMessage::assistant("Hi there"),
            LlmMessage::user("How are you?"),
        ];

        let request = provider.build_request("Be brief.", &history);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "How are you?");
    }

    #[test]
    fn test_build_request_with_image_puts_image_first() {
        let provider = create_test_provider();
        let history = vec![
            LlmMessage::user("What objects are here?")
                .with_image(InlineImage::new("image/jpeg", vec![1u8, 2, 3])),
        ];

        let request = provider.build_request("Describe.", &history);
        let json = serde_json::to_value(&request).unwrap();
        let parts = json["contents"][0]["parts"].as_array().unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert!(parts[0].get("text").is_none());
        assert_eq!(parts[1]["text"], "What objects are here?");
    }

    #[test]
    fn test_build_request_without_instruction() {
        let provider = create_test_provider();
        let request = provider.build_request("", &[LlmMessage::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_parse_response_success() {
        let provider = create_test_provider();
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hello"}, {"text": " world"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
            }"#,
        )
        .unwrap();

        let result = provider.parse_response(body).unwrap();
        assert_eq!(result.content, "Hello world");
        assert_eq!(result.total_tokens(), Some(15));
    }

    #[test]
    fn test_parse_response_without_candidates_is_empty_reply() {
        let provider = create_test_provider();
        let body: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();

        let result = provider.parse_response(body).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_response_candidate_without_parts() {
        let provider = create_test_provider();
        let body: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();

        let result = provider.parse_response(body).unwrap();
        assert_eq!(result.content, "");
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let provider = create_test_provider();
        let body: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();

        let err = provider.parse_response(body).unwrap_err();
        assert_eq!(err, ProviderError::blocked("SAFETY"));
    }

    #[test]
    fn test_classify_status() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = GeminiProvider::classify_status(StatusCode::TOO_MANY_REQUESTS, body);
        assert!(err.is_rate_limit());
        assert!(err.to_string().contains("Resource has been exhausted"));

        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        let err = GeminiProvider::classify_status(StatusCode::BAD_REQUEST, body);
        assert!(err.is_auth_error());

        let err = GeminiProvider::classify_status(StatusCode::BAD_REQUEST, "plain text");
        assert!(matches!(err, ProviderError::InvalidRequest { .. }));

        let err = GeminiProvider::classify_status(StatusCode::INTERNAL_SERVER_ERROR, "{}");
        assert!(matches!(err, ProviderError::Provider { code: Some(ref c), .. } if c == "500"));
    }

    #[test]
    fn test_provider_identity() {
        let provider = create_test_provider();
        assert_eq!(provider.provider_name(), "gemini");
        assert_eq!(provider.default_model(), "gemini-2.5-flash-lite");
        let _: &dyn LlmProvider = &provider;
    }
}
