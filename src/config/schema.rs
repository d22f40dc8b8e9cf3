use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::providers::GeminiConfig;
use crate::speech::SpeechConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    /// Root of the per-topic lesson directories
    #[serde(default = "default_lessons_dir")]
    pub lessons_dir: PathBuf,

    /// Optional JSON file overriding the built-in prompt templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_file: Option<PathBuf>,

    /// Language code used when a command does not pass `--language`
    #[serde(default = "default_language")]
    pub default_language: String,
}

fn default_lessons_dir() -> PathBuf {
    PathBuf::from("lessons")
}

fn default_language() -> String {
    "bn-BD".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            speech: SpeechConfig::default(),
            lessons_dir: default_lessons_dir(),
            prompts_file: None,
            default_language: default_language(),
        }
    }
}

/// Secret-free view of the configuration for logging
#[derive(Debug, Clone, PartialEq)]
pub struct SafeConfigSummary {
    pub gemini_key_configured: bool,
    pub speech_key_configured: bool,
    pub model: String,
    pub lessons_dir: PathBuf,
    pub prompts_file_configured: bool,
    pub default_language: String,
}

impl Config {
    pub fn get_safe_summary(&self) -> SafeConfigSummary {
        SafeConfigSummary {
            gemini_key_configured: self.gemini.has_api_key(),
            speech_key_configured: self.speech.has_api_key(),
            model: self.gemini.default_model.clone(),
            lessons_dir: self.lessons_dir.clone(),
            prompts_file_configured: self.prompts_file.is_some(),
            default_language: self.default_language.clone(),
        }
    }
}
