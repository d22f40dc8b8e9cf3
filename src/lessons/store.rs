//! Lesson directory reader

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::types::{LessonError, LessonMetadata, LessonSummary, QuizQuestion};
use crate::session::LanguageFamily;

const METADATA_FILENAME: &str = "metadata.json";
const QUIZ_FILENAME: &str = "quiz.json";

/// Reads lessons from a root directory
#[derive(Debug, Clone)]
pub struct LessonStore {
    root: PathBuf,
}

impl LessonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rejects ids that could escape the lessons root
    pub fn validate_topic(topic: &str) -> Result<(), LessonError> {
        let invalid = topic.trim().is_empty()
            || topic.contains('/')
            || topic.contains('\\')
            || topic.contains("..")
            || topic.starts_with('.');
        if invalid {
            return Err(LessonError::InvalidTopic(topic.to_string()));
        }
        Ok(())
    }

    fn topic_dir(&self, topic: &str) -> Result<PathBuf, LessonError> {
        Self::validate_topic(topic)?;
        Ok(self.root.join(topic))
    }

    /// Lists every topic with readable metadata, sorted by id
    ///
    /// Hidden directories and directories without `metadata.json` are skipped.
    /// A missing root yields an empty list.
    pub fn list_lessons(&self) -> Result<Vec<LessonSummary>, LessonError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "Lessons directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(LessonError::Read(self.root.clone(), e)),
        };

        let mut lessons = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LessonError::Read(self.root.clone(), e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let Some(id) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if id.starts_with('.') {
                debug!(dir = %id, "Skipping hidden lesson directory");
                continue;
            }

            let metadata_path = path.join(METADATA_FILENAME);
            if !metadata_path.exists() {
                debug!(dir = %id, "Skipping lesson directory without metadata");
                continue;
            }

            match read_json::<LessonMetadata>(&metadata_path) {
                Ok(metadata) => lessons.push(LessonSummary::from_metadata(id, metadata)),
                Err(e) => warn!(dir = %id, error = %e, "Skipping lesson with unreadable metadata"),
            }
        }

        lessons.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(lessons)
    }

    /// Reads a topic's metadata
    pub fn metadata(&self, topic: &str) -> Result<LessonMetadata, LessonError> {
        let path = self.topic_dir(topic)?.join(METADATA_FILENAME);
        if !path.exists() {
            return Err(LessonError::TopicNotFound(topic.to_string()));
        }
        read_json(&path)
    }

    /// Returns the lesson material for `family`, falling back to English
    pub fn content(&self, topic: &str, family: LanguageFamily) -> Result<String, LessonError> {
        let dir = self.topic_dir(topic)?;
        if !dir.is_dir() {
            return Err(LessonError::TopicNotFound(topic.to_string()));
        }

        let mut candidates = vec![content_path(&dir, family)];
        if family != LanguageFamily::En {
            candidates.push(content_path(&dir, LanguageFamily::En));
        }

        for path in candidates {
            match fs::read_to_string(&path) {
                Ok(text) => {
                    debug!(path = %path.display(), chars = text.chars().count(), "Loaded lesson content");
                    return Ok(text);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(LessonError::Read(path, e)),
            }
        }

        Err(LessonError::ContentNotFound(topic.to_string()))
    }

    /// Reads a topic's quiz; a missing `quiz.json` is `QuizNotFound`
    pub fn quiz(&self, topic: &str) -> Result<Vec<QuizQuestion>, LessonError> {
        let path = self.topic_dir(topic)?.join(QUIZ_FILENAME);
        if !path.exists() {
            return Err(LessonError::QuizNotFound(topic.to_string()));
        }
        read_json(&path)
    }
}

fn content_path(dir: &Path, family: LanguageFamily) -> PathBuf {
    dir.join(format!("content_{}.txt", family))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LessonError> {
    let content =
        fs::read_to_string(path).map_err(|e| LessonError::Read(path.to_path_buf(), e))?;
    serde_json::from_str(&content).map_err(|e| LessonError::Parse(path.to_path_buf(), e))
}
