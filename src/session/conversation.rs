//! Live conversation handle

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::providers::{LlmMessage, LlmProvider, LlmResponse, ProviderError};
use crate::session::key::SessionKey;

/// One ongoing multi-turn exchange with the language model
///
/// The system instruction is fixed at construction. Turn history sits behind
/// an async mutex, so concurrent turns on the same handle run one at a time.
#[derive(Debug)]
pub struct Conversation {
    id: Uuid,
    key: SessionKey,
    instruction: String,
    created_at: DateTime<Utc>,
    history: Mutex<Vec<LlmMessage>>,
}

impl Conversation {
    pub fn new(key: SessionKey, instruction: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            instruction: instruction.into(),
            created_at: Utc::now(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns a snapshot of the turn history
    pub async fn history(&self) -> Vec<LlmMessage> {
        self.history.lock().await.clone()
    }

    /// Number of completed exchanges
    pub async fn turn_count(&self) -> usize {
        self.history.lock().await.len() / 2
    }

    /// Sends one user turn with the full history and records the exchange
    ///
    /// The history lock is held for the whole exchange. It guards only this
    /// handle, never the store. Nothing is recorded when the provider fails.
    pub async fn exchange(
        &self,
        provider: &dyn LlmProvider,
        model: &str,
        message: LlmMessage,
    ) -> Result<LlmResponse, ProviderError> {
        let mut history = self.history.lock().await;

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend(history.iter().cloned());
        messages.push(message.clone());

        debug!(
            session_id = %self.id,
            session = %self.key,
            prior_messages = history.len(),
            has_image = message.has_image(),
            "Sending turn"
        );

        let response = provider.chat(&self.instruction, &messages, model).await?;

        history.push(message);
        history.push(LlmMessage::assistant(response.content.clone()));

        Ok(response)
    }
}
