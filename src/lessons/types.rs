//! Lesson content types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::LanguageFamily;

/// Error types for lesson content operations
#[derive(Error, Debug)]
pub enum LessonError {
    #[error("Lesson not found: {0}")]
    TopicNotFound(String),

    #[error("No content file for lesson: {0}")]
    ContentNotFound(String),

    #[error("No quiz for lesson: {0}")]
    QuizNotFound(String),

    #[error("Invalid topic id: {0:?}")]
    InvalidTopic(String),

    #[error("Failed to read lesson file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Invalid JSON in lesson file {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonMetadata {
    pub title_en: String,
    pub title_bn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_bn: Option<String>,
}

impl LessonMetadata {
    pub fn title(&self, family: LanguageFamily) -> &str {
        match family {
            LanguageFamily::En => &self.title_en,
            LanguageFamily::Bn => &self.title_bn,
        }
    }

    pub fn description(&self, family: LanguageFamily) -> Option<&str> {
        match family {
            LanguageFamily::En => self.description_en.as_deref(),
            LanguageFamily::Bn => self.description_bn.as_deref(),
        }
    }
}

/// One entry of the lesson listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonSummary {
    /// Directory name
    pub id: String,
    pub title_en: String,
    pub title_bn: String,
}

impl LessonSummary {
    pub fn from_metadata(id: impl Into<String>, metadata: LessonMetadata) -> Self {
        Self {
            id: id.into(),
            title_en: metadata.title_en,
            title_bn: metadata.title_bn,
        }
    }
}

/// One bilingual multiple-choice question from `quiz.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub question_en: String,
    pub question_bn: String,
    pub options_en: Vec<String>,
    pub options_bn: Vec<String>,
    pub correct_answer_en: String,
    pub correct_answer_bn: String,
}

impl QuizQuestion {
    pub fn question(&self, family: LanguageFamily) -> &str {
        match family {
            LanguageFamily::En => &self.question_en,
            LanguageFamily::Bn => &self.question_bn,
        }
    }

    pub fn options(&self, family: LanguageFamily) -> &[String] {
        match family {
            LanguageFamily::En => &self.options_en,
            LanguageFamily::Bn => &self.options_bn,
        }
    }

    pub fn correct_answer(&self, family: LanguageFamily) -> &str {
        match family {
            LanguageFamily::En => &self.correct_answer_en,
            LanguageFamily::Bn => &self.correct_answer_bn,
        }
    }
}
