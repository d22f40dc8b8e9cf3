//! Voice pipeline
//!
//! Chains speech-to-text, the conversation gateway, markdown stripping and
//! text-to-speech into one request/response flow. Every upward operation
//! (chat, scene description, lessons, reset, listing, quiz) lives here.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::gateway::{ConversationGateway, ImagePayload, TurnRequest};
use crate::lessons::{LessonStore, LessonSummary, QuizQuestion};
use crate::providers::{LlmProvider, ProviderConfig, ProviderFactory};
use crate::session::{LanguageFamily, Mode, PromptResolver, PromptTable, SessionStore};
use crate::speech::{
    AudioHints, GoogleSpeechClient, GoogleTtsClient, SpeechToText, TextToSpeech,
};
use crate::text::strip_markdown;
use crate::utils::error::{Result, VoiceError};

/// Recorded audio plus its format hints
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub bytes: Bytes,
    pub hints: AudioHints,
}

impl AudioInput {
    pub fn new(bytes: impl Into<Bytes>, hints: AudioHints) -> Self {
        Self {
            bytes: bytes.into(),
            hints,
        }
    }

    /// Builds hints from an upload's filename or content type
    pub fn from_upload(
        bytes: impl Into<Bytes>,
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> Self {
        Self::new(bytes, AudioHints::detect(filename, content_type))
    }
}

/// Texts and synthesized audio of one completed voice turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceReply {
    pub user_text: String,
    /// Markdown-stripped model reply; may be empty
    pub assistant_text: String,
    /// Base64 LINEAR16 audio; empty when the reply was empty
    pub audio_base64: String,
}

/// Result of a voice turn
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceOutcome {
    /// The recording contained no recognizable speech
    NoSpeech,
    Reply(VoiceReply),
}

impl VoiceOutcome {
    pub fn reply(&self) -> Option<&VoiceReply> {
        match self {
            VoiceOutcome::Reply(reply) => Some(reply),
            VoiceOutcome::NoSpeech => None,
        }
    }
}

fn kickoff_message(family: LanguageFamily) -> &'static str {
    match family {
        LanguageFamily::En => "Please start the lesson.",
        LanguageFamily::Bn => "অনুগ্রহ করে পাঠটি শুরু করুন।",
    }
}

pub struct VoicePipeline {
    gateway: ConversationGateway,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn TextToSpeech>,
    lessons: LessonStore,
}

impl VoicePipeline {
    pub fn new(
        gateway: ConversationGateway,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
        lessons: LessonStore,
    ) -> Self {
        Self {
            gateway,
            stt,
            tts,
            lessons,
        }
    }

    /// Wires the Gemini provider, Google speech clients and lesson store
    ///
    /// Fails with [`VoiceError::Config`] when the prompt table is incomplete
    /// or a client cannot be configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver = build_resolver(config)?;
        let store = Arc::new(SessionStore::new(resolver));

        let provider: Arc<dyn LlmProvider> =
            ProviderFactory::create(ProviderConfig::Gemini(config.gemini.clone()))
                .map_err(|e| VoiceError::config(e.to_string()))?
                .into();

        // The speech key is not checked here: text-only callers never reach
        // the speech clients, and a missing key surfaces as an auth error.
        let stt = GoogleSpeechClient::try_from_config(&config.speech)
            .map_err(|e| VoiceError::config(e.to_string()))?;
        let tts = GoogleTtsClient::try_from_config(&config.speech)
            .map_err(|e| VoiceError::config(e.to_string()))?;

        info!(
            model = %config.gemini.default_model,
            lessons_dir = %config.lessons_dir.display(),
            "Voice pipeline ready"
        );

        Ok(Self::new(
            ConversationGateway::new(store, provider),
            Arc::new(stt),
            Arc::new(tts),
            LessonStore::new(&config.lessons_dir),
        ))
    }

    pub fn gateway(&self) -> &ConversationGateway {
        &self.gateway
    }

    pub fn lessons(&self) -> &LessonStore {
        &self.lessons
    }

    /// Text-only chat turn; returns the markdown-stripped reply
    #[instrument(skip_all, fields(language = %language))]
    pub async fn chat_text(&self, text: &str, language: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(VoiceError::invalid_input("message is empty"));
        }
        let reply = self
            .gateway
            .send(TurnRequest::new(text, Mode::Chat, language))
            .await?;
        Ok(strip_markdown(&reply.text))
    }

    /// Voice chat turn
    #[instrument(skip_all, fields(language = %language))]
    pub async fn chat_audio(&self, audio: &AudioInput, language: &str) -> Result<VoiceOutcome> {
        let Some(user_text) = self.transcribe(audio, language).await? else {
            return Ok(VoiceOutcome::NoSpeech);
        };
        self.respond(TurnRequest::new(user_text, Mode::Chat, language))
            .await
            .map(VoiceOutcome::Reply)
    }

    /// Spoken question about a camera image; never carries history
    #[instrument(skip_all, fields(language = %language))]
    pub async fn describe_scene(
        &self,
        audio: &AudioInput,
        image: ImagePayload,
        language: &str,
    ) -> Result<VoiceOutcome> {
        if image.bytes.is_empty() {
            return Err(VoiceError::invalid_input("image is empty"));
        }
        let Some(user_text) = self.transcribe(audio, language).await? else {
            return Ok(VoiceOutcome::NoSpeech);
        };
        let request = TurnRequest::new(user_text, Mode::ObjectDetection, language).with_image(image);
        self.respond(request).await.map(VoiceOutcome::Reply)
    }

    /// Starts (or restarts) a lesson grounded in its content file
    ///
    /// Any existing session for the topic is replaced in the same step that
    /// creates the new one, so the material is always baked in.
    #[instrument(skip_all, fields(topic = %topic, language = %language))]
    pub async fn start_lesson(&self, topic: &str, language: &str) -> Result<VoiceOutcome> {
        let request = self.lesson_kickoff(topic, language)?;
        self.respond(request).await.map(VoiceOutcome::Reply)
    }

    /// Text-only variant of [`VoicePipeline::start_lesson`]
    pub async fn start_lesson_text(&self, topic: &str, language: &str) -> Result<String> {
        let request = self.lesson_kickoff(topic, language)?;
        let reply = self.gateway.send(request).await?;
        Ok(strip_markdown(&reply.text))
    }

    fn lesson_kickoff(&self, topic: &str, language: &str) -> Result<TurnRequest> {
        let family = LanguageFamily::from_code(language);
        let content = self.lessons.content(topic, family)?;
        Ok(TurnRequest::new(kickoff_message(family), Mode::lesson(topic), language)
            .with_context(content)
            .fresh_session())
    }

    /// Follow-up spoken turn in a lesson
    ///
    /// Grounding is not resupplied: a session that was never started, or was
    /// reset, runs on the base lesson instruction.
    #[instrument(skip_all, fields(topic = %topic, language = %language))]
    pub async fn lesson_audio(
        &self,
        audio: &AudioInput,
        topic: &str,
        language: &str,
    ) -> Result<VoiceOutcome> {
        LessonStore::validate_topic(topic)?;
        let Some(user_text) = self.transcribe(audio, language).await? else {
            return Ok(VoiceOutcome::NoSpeech);
        };
        self.respond(TurnRequest::new(user_text, Mode::lesson(topic), language))
            .await
            .map(VoiceOutcome::Reply)
    }

    /// Text follow-up in a lesson; returns the markdown-stripped reply
    pub async fn lesson_text(&self, text: &str, topic: &str, language: &str) -> Result<String> {
        LessonStore::validate_topic(topic)?;
        if text.trim().is_empty() {
            return Err(VoiceError::invalid_input("message is empty"));
        }
        let reply = self
            .gateway
            .send(TurnRequest::new(text, Mode::lesson(topic), language))
            .await?;
        Ok(strip_markdown(&reply.text))
    }

    /// Drops the session for `(mode, language)`; never fails
    pub fn reset(&self, mode: &Mode, language: &str) {
        self.gateway.reset(mode, language);
    }

    pub fn list_lessons(&self) -> Result<Vec<LessonSummary>> {
        Ok(self.lessons.list_lessons()?)
    }

    pub fn quiz(&self, topic: &str) -> Result<Vec<QuizQuestion>> {
        Ok(self.lessons.quiz(topic)?)
    }

    /// Returns `None` when no speech was recognized
    async fn transcribe(&self, audio: &AudioInput, language: &str) -> Result<Option<String>> {
        if audio.bytes.is_empty() {
            return Err(VoiceError::invalid_input("audio is empty"));
        }

        let transcript = self
            .stt
            .transcribe(&audio.bytes, audio.hints, language)
            .await
            .map_err(VoiceError::transcription)?;

        if transcript.trim().is_empty() {
            info!(bytes = audio.bytes.len(), "No speech detected");
            return Ok(None);
        }
        debug!(chars = transcript.chars().count(), "Transcribed user turn");
        Ok(Some(transcript))
    }

    /// Sends the turn, strips markdown and synthesizes the reply
    async fn respond(&self, request: TurnRequest) -> Result<VoiceReply> {
        let language = request.language.clone();
        let user_text = request.message.clone();

        let reply = self.gateway.send(request).await?;
        let assistant_text = strip_markdown(&reply.text);

        if assistant_text.is_empty() {
            warn!(session_id = %reply.session_id, "Model returned an empty reply, skipping synthesis");
            return Ok(VoiceReply {
                user_text,
                assistant_text,
                audio_base64: String::new(),
            });
        }

        let audio = self
            .tts
            .synthesize(&assistant_text, &language)
            .await
            .map_err(VoiceError::synthesis)?;

        debug!(audio_bytes = audio.len(), "Synthesized reply");

        Ok(VoiceReply {
            user_text,
            assistant_text,
            audio_base64: BASE64.encode(&audio),
        })
    }
}

/// Built-in templates, overridden by the configured prompts file
fn build_resolver(config: &Config) -> Result<PromptResolver> {
    let table = match &config.prompts_file {
        Some(path) => {
            debug!(path = %path.display(), "Loading prompt overrides");
            PromptTable::load(path)?.merged_over(&PromptTable::builtin())
        }
        None => PromptTable::builtin(),
    };
    Ok(PromptResolver::new(table)?)
}
