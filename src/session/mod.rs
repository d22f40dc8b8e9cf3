//! Conversation session management
//!
//! Sessions are addressed by [`SessionKey`] and owned by a [`SessionStore`].
//! Each stored [`Conversation`] carries an instruction resolved once, at
//! creation, by the [`PromptResolver`].

pub mod conversation;
pub mod key;
pub mod prompt;
pub mod store;

pub use conversation::Conversation;
pub use key::{LanguageFamily, Mode, ModeKind, SessionKey};
pub use prompt::{PromptError, PromptResolver, PromptTable, legacy_topic_name};
pub use store::SessionStore;
