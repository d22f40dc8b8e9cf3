//! Mock LLM provider for testing
//!
//! Records every call and returns configurable responses or errors without
//! making network requests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::providers::{LlmMessage, LlmProvider, LlmResponse, ProviderError};

/// One recorded `chat` invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system_instruction: String,
    pub messages: Vec<LlmMessage>,
    pub model: String,
}

/// Mock provider for testing
pub struct MockLlmProvider {
    /// Fallback response when no queued response is left
    response: Arc<Mutex<LlmResponse>>,
    /// Responses returned in order before falling back to `response`
    queued: Arc<Mutex<VecDeque<LlmResponse>>>,
    /// Optional error to return instead of a response
    error: Arc<Mutex<Option<ProviderError>>>,
    default_model: String,
    name: &'static str,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(LlmResponse::new("Mock response"))),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            error: Arc::new(Mutex::new(None)),
            default_model: "mock-model".to_string(),
            name: "MockProvider",
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the fallback response content
    pub fn set_response(&self, content: impl Into<String>) {
        *self.response.lock().unwrap() = LlmResponse::new(content);
    }

    /// Queues a response to be returned by the next unanswered call
    pub fn push_response(&self, content: impl Into<String>) {
        self.queued
            .lock()
            .unwrap()
            .push_back(LlmResponse::new(content));
    }

    /// Sets the error to return (instead of the response)
    pub fn set_error(&self, error: ProviderError) {
        *self.error.lock().unwrap() = Some(error);
    }

    /// Clears any set error
    pub fn clear_error(&self) {
        *self.error.lock().unwrap() = None;
    }

    /// Returns the number of times chat() was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns all recorded calls
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the most recent call, if any
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockLlmProvider {
    async fn chat(
        &self,
        system_instruction: &str,
        messages: &[LlmMessage],
        model: &str,
    ) -> Result<LlmResponse, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system_instruction: system_instruction.to_string(),
            messages: messages.to_vec(),
            model: model.to_string(),
        });

        if let Some(err) = self.error.lock().unwrap().clone() {
            return Err(err);
        }

        if let Some(response) = self.queued.lock().unwrap().pop_front() {
            return Ok(response);
        }

        Ok(self.response.lock().unwrap().clone())
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockLlmProvider::new();
        mock.set_response("Hello!");

        let response = mock
            .chat("instr", &[LlmMessage::user("Hi")], "m")
            .await
            .unwrap();

        assert_eq!(response.content, "Hello!");
        assert_eq!(mock.call_count(), 1);
        let call = mock.last_call().unwrap();
        assert_eq!(call.system_instruction, "instr");
        assert_eq!(call.messages[0].content, "Hi");
    }

    #[tokio::test]
    async fn test_mock_queue_then_fallback() {
        let mock = MockLlmProvider::new();
        mock.push_response("first");

        let a = mock.chat("", &[], "m").await.unwrap();
        let b = mock.chat("", &[], "m").await.unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "Mock response");
    }

    #[tokio::test]
    async fn test_mock_error() {
        let mock = MockLlmProvider::new();
        mock.set_error(ProviderError::network("down"));
        assert!(mock.chat("", &[], "m").await.is_err());

        mock.clear_error();
        assert!(mock.chat("", &[], "m").await.is_ok());
    }
}
