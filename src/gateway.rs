//! Conversation gateway
//!
//! Single entry point for turn exchange. The gateway fetches the handle from
//! the [`SessionStore`], builds the outgoing turn and calls the language model
//! without holding any store-wide lock.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::providers::{InlineImage, LlmMessage, LlmProvider};
use crate::session::{Mode, SessionStore};
use crate::utils::error::{Result, VoiceError};

/// Image attached to an object-detection turn
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// One user turn
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub mode: Mode,
    pub language: String,
    pub image: Option<ImagePayload>,
    /// Grounding material; only read when the session is created
    pub context: Option<String>,
    /// Replace any existing session instead of reusing it
    pub fresh: bool,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>, mode: Mode, language: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            mode,
            language: language.into(),
            image: None,
            context: None,
            fresh: false,
        }
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Starts this turn on a new session built from the request's context
    pub fn fresh_session(mut self) -> Self {
        self.fresh = true;
        self
    }
}

/// Reply of one turn
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    /// Model reply; may be empty
    pub text: String,
    pub session_id: Uuid,
}

impl GatewayReply {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub struct ConversationGateway {
    store: Arc<SessionStore>,
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl ConversationGateway {
    /// Creates a gateway that uses the provider's default model
    pub fn new(store: Arc<SessionStore>, provider: Arc<dyn LlmProvider>) -> Self {
        let model = provider.default_model();
        Self {
            store,
            provider,
            model,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Exchanges one turn and returns the model's reply
    ///
    /// Provider failures surface as [`VoiceError::Generation`] and are not
    /// retried. An empty reply is returned as-is.
    #[instrument(skip_all, fields(mode = %request.mode, language = %request.language))]
    pub async fn send(&self, request: TurnRequest) -> Result<GatewayReply> {
        let TurnRequest {
            message,
            mode,
            language,
            image,
            context,
            fresh,
        } = request;

        let conversation = if fresh {
            self.store.recreate(&mode, &language, context.as_deref())
        } else {
            self.store.get_or_create(&mode, &language, context.as_deref())
        };

        let mut turn = LlmMessage::user(message);
        match image {
            Some(image) if matches!(mode, Mode::ObjectDetection) => {
                debug!(
                    mime_type = %image.mime_type,
                    bytes = image.bytes.len(),
                    "Attaching image to turn"
                );
                turn = turn.with_image(InlineImage::new(image.mime_type, image.bytes));
            }
            Some(_) => debug!("Ignoring image outside object detection"),
            None => {}
        }

        let response = conversation
            .exchange(self.provider.as_ref(), &self.model, turn)
            .await
            .map_err(VoiceError::generation)?;

        info!(
            session_id = %conversation.id(),
            reply_chars = response.content.chars().count(),
            "Turn completed"
        );

        Ok(GatewayReply {
            text: response.content,
            session_id: conversation.id(),
        })
    }

    /// Drops the session for `(mode, language)`; idempotent
    pub fn reset(&self, mode: &Mode, language: &str) {
        self.store.reset(mode, language);
    }
}
