//! Shared fakes for integration tests

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use voicetutor::providers::{LlmMessage, LlmProvider, LlmResponse, ProviderError};

/// One recorded provider call
#[derive(Debug, Clone)]
pub struct Call {
    pub system_instruction: String,
    pub messages: Vec<LlmMessage>,
}

/// Provider that echoes the last user message and records every call
pub struct EchoProvider {
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_with: Mutex<Option<ProviderError>>,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_with(&self, err: ProviderError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Call {
        self.calls().pop().expect("no provider calls recorded")
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmProvider for EchoProvider {
    async fn chat(
        &self,
        system_instruction: &str,
        messages: &[LlmMessage],
        _model: &str,
    ) -> Result<LlmResponse, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.calls.lock().unwrap().push(Call {
            system_instruction: system_instruction.to_string(),
            messages: messages.to_vec(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }

        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(LlmResponse::new(format!("echo: {}", last)))
    }

    fn default_model(&self) -> String {
        "echo-model".to_string()
    }

    fn provider_name(&self) -> &'static str {
        "echo"
    }
}
