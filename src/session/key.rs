//! Session identity: interaction mode, language code and lesson topic

use std::fmt;

/// Interaction mode of a conversation
///
/// The lesson topic lives inside the variant, so a topic can only exist for
/// lesson sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Free-form voice chat
    Chat,
    /// Image-grounded description; every turn starts from a fresh conversation
    ObjectDetection,
    /// Lesson delivery for one topic
    LessonDelivery { topic: String },
}

impl Mode {
    pub fn lesson(topic: impl Into<String>) -> Self {
        Mode::LessonDelivery {
            topic: topic.into(),
        }
    }

    /// Returns the payload-free discriminant used to key prompt templates
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Chat => ModeKind::Chat,
            Mode::ObjectDetection => ModeKind::ObjectDetection,
            Mode::LessonDelivery { .. } => ModeKind::LessonDelivery,
        }
    }

    /// Returns the lesson topic, if this is a lesson session
    pub fn topic(&self) -> Option<&str> {
        match self {
            Mode::LessonDelivery { topic } => Some(topic),
            _ => None,
        }
    }

    /// Single-shot sessions never carry history across turns: the store
    /// replaces the conversation on every request.
    pub fn is_single_shot(&self) -> bool {
        matches!(self, Mode::ObjectDetection)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::LessonDelivery { topic } => write!(f, "{}:{}", self.kind(), topic),
            _ => write!(f, "{}", self.kind()),
        }
    }
}

/// Mode discriminant without the topic payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModeKind {
    Chat,
    ObjectDetection,
    LessonDelivery,
}

impl ModeKind {
    pub const ALL: [ModeKind; 3] = [
        ModeKind::Chat,
        ModeKind::ObjectDetection,
        ModeKind::LessonDelivery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModeKind::Chat => "chat",
            ModeKind::ObjectDetection => "object_detection",
            ModeKind::LessonDelivery => "lesson_delivery",
        }
    }

    /// Parses the snake_case name used in prompt files
    pub fn parse(name: &str) -> Option<Self> {
        ModeKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse language bucket used to pick prompt templates and lesson files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LanguageFamily {
    En,
    Bn,
}

impl LanguageFamily {
    pub const ALL: [LanguageFamily; 2] = [LanguageFamily::En, LanguageFamily::Bn];

    /// `En` for any code starting with "en" (case as given), `Bn` for everything else
    pub fn from_code(code: &str) -> Self {
        if code.starts_with("en") {
            LanguageFamily::En
        } else {
            LanguageFamily::Bn
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageFamily::En => "en",
            LanguageFamily::Bn => "bn",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        LanguageFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == name)
    }
}

impl fmt::Display for LanguageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one conversation
///
/// The raw language code is part of the key, so `bn-BD` and `bn-IN` address
/// different sessions even though they share a template family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub mode: Mode,
    pub language: String,
}

impl SessionKey {
    pub fn new(mode: Mode, language: impl Into<String>) -> Self {
        Self {
            mode,
            language: language.into(),
        }
    }

    pub fn family(&self) -> LanguageFamily {
        LanguageFamily::from_code(&self.language)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mode {
            Mode::LessonDelivery { topic } => {
                write!(f, "{}:{}:{}", self.mode.kind(), self.language, topic)
            }
            mode => write!(f, "{}:{}", mode.kind(), self.language),
        }
    }
}
