//! voicetutor: a voice tutoring backend
//!
//! Speech-to-text, a Gemini conversation and text-to-speech chained into one
//! request/response flow, with lesson delivery grounded in supplied material
//! and image-grounded scene description.

pub mod config;
pub mod gateway;
pub mod lessons;
pub mod pipeline;
pub mod providers;
pub mod session;
pub mod speech;
pub mod text;
pub mod utils;

pub use gateway::{ConversationGateway, GatewayReply, ImagePayload, TurnRequest};
pub use pipeline::{AudioInput, VoiceOutcome, VoicePipeline, VoiceReply};
pub use session::{Mode, SessionKey, SessionStore};
pub use utils::{Stage, VoiceError};
