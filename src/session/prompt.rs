//! Prompt templates and instruction resolution
//!
//! A `PromptTable` holds one base instruction per (mode, language family). The
//! table is checked for completeness once, when the `PromptResolver` is built;
//! after that, resolution cannot fail and has no side effects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::key::{LanguageFamily, Mode, ModeKind};

/// Errors raised while loading or validating prompt templates
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Missing prompt template for mode '{mode}' and language '{family}'")]
    MissingTemplate {
        mode: ModeKind,
        family: LanguageFamily,
    },

    #[error("Unknown mode '{0}' in prompt file")]
    UnknownMode(String),

    #[error("Unknown language family '{0}' in prompt file")]
    UnknownFamily(String),

    #[error("Failed to read prompt file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Prompt file {0} contains invalid JSON: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),
}

const CHAT_EN: &str = "You are a friendly voice assistant. Your replies are read aloud, \
so keep them short, conversational and free of markdown, lists or emoji. \
Answer in English.";

const CHAT_BN: &str = "আপনি একজন বন্ধুসুলভ ভয়েস সহকারী। আপনার উত্তর উচ্চস্বরে পড়ে শোনানো হয়, \
তাই উত্তর ছোট ও কথোপকথনের মতো রাখুন এবং কোনো মার্কডাউন, তালিকা বা ইমোজি ব্যবহার করবেন না। \
সবসময় বাংলায় উত্তর দিন।";

const OBJECT_DETECTION_EN: &str = "You describe what is visible in a camera image for a \
listener who cannot see it. Name the main objects, how many there are and where they are, \
in two or three short spoken sentences. Ignore people unless asked about them. \
Answer in English without markdown.";

const OBJECT_DETECTION_BN: &str = "আপনি এমন একজন শ্রোতার জন্য ক্যামেরার ছবিতে কী দেখা যাচ্ছে তা বর্ণনা করেন \
যিনি ছবিটি দেখতে পান না। প্রধান বস্তুগুলোর নাম, সংখ্যা ও অবস্থান দুই-তিনটি ছোট বাক্যে বলুন। \
জিজ্ঞাসা না করলে মানুষের কথা উল্লেখ করবেন না। মার্কডাউন ছাড়া বাংলায় উত্তর দিন।";

const LESSON_EN: &str = "You are a patient teacher delivering a spoken lesson to a student. \
Explain one idea at a time in simple language, check understanding with a short question, \
and answer follow-up questions. Your words are read aloud, so do not use markdown. \
Teach in English.";

const LESSON_BN: &str = "আপনি একজন ধৈর্যশীল শিক্ষক, যিনি একজন শিক্ষার্থীকে মুখে মুখে পাঠ দিচ্ছেন। \
একবারে একটি বিষয় সহজ ভাষায় ব্যাখ্যা করুন, ছোট প্রশ্ন করে বোঝাপড়া যাচাই করুন এবং \
পরবর্তী প্রশ্নের উত্তর দিন। আপনার কথা উচ্চস্বরে পড়া হয়, তাই মার্কডাউন ব্যবহার করবেন না। \
বাংলায় পড়ান।";

/// Topics that predate supplied lesson material, with localized display names
const LEGACY_TOPICS: &[(&str, &str, &str)] = &[
    (
        "liberation-war",
        "the Liberation War of Bangladesh (1971)",
        "বাংলাদেশের মুক্তিযুদ্ধ (১৯৭১)",
    ),
    ("world-war-2", "World War II", "দ্বিতীয় বিশ্বযুদ্ধ"),
];

const MATERIAL_BEGIN: &str = "<<<LESSON MATERIAL>>>";
const MATERIAL_END: &str = "<<<END LESSON MATERIAL>>>";

/// Base instruction templates keyed by mode and language family
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTable {
    templates: BTreeMap<(ModeKind, LanguageFamily), String>,
}

/// On-disk shape: `{ "chat": { "en": "...", "bn": "..." }, ... }`
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct PromptFile(BTreeMap<String, BTreeMap<String, String>>);

impl PromptTable {
    /// Creates an empty table
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Returns the built-in templates for every mode and family
    pub fn builtin() -> Self {
        Self::empty()
            .with_template(ModeKind::Chat, LanguageFamily::En, CHAT_EN)
            .with_template(ModeKind::Chat, LanguageFamily::Bn, CHAT_BN)
            .with_template(ModeKind::ObjectDetection, LanguageFamily::En, OBJECT_DETECTION_EN)
            .with_template(ModeKind::ObjectDetection, LanguageFamily::Bn, OBJECT_DETECTION_BN)
            .with_template(ModeKind::LessonDelivery, LanguageFamily::En, LESSON_EN)
            .with_template(ModeKind::LessonDelivery, LanguageFamily::Bn, LESSON_BN)
    }

    /// Sets or replaces one template
    pub fn with_template(
        mut self,
        mode: ModeKind,
        family: LanguageFamily,
        text: impl Into<String>,
    ) -> Self {
        self.templates.insert((mode, family), text.into());
        self
    }

    /// Parses a JSON prompt file into a table
    ///
    /// Only the entries present in the file are set; combine with
    /// [`PromptTable::merged_over`] to fill gaps from another table.
    pub fn from_json(content: &str, source: &Path) -> Result<Self, PromptError> {
        let file: PromptFile = serde_json::from_str(content)
            .map_err(|e| PromptError::Parse(source.to_path_buf(), e))?;

        let mut table = Self::empty();
        for (mode_name, by_family) in file.0 {
            let mode =
                ModeKind::parse(&mode_name).ok_or_else(|| PromptError::UnknownMode(mode_name.clone()))?;
            for (family_name, text) in by_family {
                let family = LanguageFamily::parse(&family_name)
                    .ok_or_else(|| PromptError::UnknownFamily(family_name.clone()))?;
                table = table.with_template(mode, family, text.trim());
            }
        }
        Ok(table)
    }

    /// Reads a JSON prompt file from disk
    pub fn load(path: &Path) -> Result<Self, PromptError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PromptError::Read(path.to_path_buf(), e))?;
        Self::from_json(&content, path)
    }

    /// Returns `self` with gaps filled from `base`
    pub fn merged_over(mut self, base: &PromptTable) -> Self {
        for (key, text) in &base.templates {
            self.templates.entry(*key).or_insert_with(|| text.clone());
        }
        self
    }

    pub fn get(&self, mode: ModeKind, family: LanguageFamily) -> Option<&str> {
        self.templates.get(&(mode, family)).map(String::as_str)
    }

    /// Checks that every (mode, family) combination has a template
    pub fn validate(&self) -> Result<(), PromptError> {
        for mode in ModeKind::ALL {
            for family in LanguageFamily::ALL {
                match self.get(mode, family) {
                    Some(text) if !text.trim().is_empty() => {}
                    _ => return Err(PromptError::MissingTemplate { mode, family }),
                }
            }
        }
        Ok(())
    }
}

impl Default for PromptTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Builds the system instruction for a conversation about to be created
#[derive(Debug, Clone)]
pub struct PromptResolver {
    table: PromptTable,
}

impl PromptResolver {
    /// Creates a resolver, rejecting an incomplete template table
    pub fn new(table: PromptTable) -> Result<Self, PromptError> {
        table.validate()?;
        Ok(Self { table })
    }

    /// Resolver over the built-in templates
    pub fn builtin() -> Self {
        Self {
            table: PromptTable::builtin(),
        }
    }

    pub fn table(&self) -> &PromptTable {
        &self.table
    }

    /// Produces the instruction text for `mode` in `language`
    ///
    /// For lessons, supplied material takes precedence over the legacy topic
    /// directive. Whitespace-only material counts as absent.
    pub fn resolve(&self, mode: &Mode, language: &str, context: Option<&str>) -> String {
        let family = LanguageFamily::from_code(language);
        let mut instruction = self
            .table
            .get(mode.kind(), family)
            // validate() ran in new(), every combination is present
            .unwrap_or_default()
            .to_string();

        if let Mode::LessonDelivery { topic } = mode {
            if let Some(material) = context.filter(|c| !c.trim().is_empty()) {
                instruction.push_str("\n\n");
                instruction.push_str(&grounding_directive(family, material));
            } else if let Some(name) = legacy_topic_name(topic, family) {
                instruction.push_str("\n\n");
                instruction.push_str(&topic_directive(family, name));
            }
        }

        instruction
    }
}

/// Returns the localized display name of a legacy static topic
pub fn legacy_topic_name(topic: &str, family: LanguageFamily) -> Option<&'static str> {
    LEGACY_TOPICS
        .iter()
        .find(|(id, _, _)| *id == topic)
        .map(|(_, en, bn)| match family {
            LanguageFamily::En => *en,
            LanguageFamily::Bn => *bn,
        })
}

fn grounding_directive(family: LanguageFamily, material: &str) -> String {
    let lead = match family {
        LanguageFamily::En => {
            "Teach strictly from the lesson material below. Do not add facts that are not in it. \
If the student asks about something the material does not cover, say that it is outside \
this lesson and steer back to the material."
        }
        LanguageFamily::Bn => {
            "নিচের পাঠ্য উপকরণ থেকে কঠোরভাবে পড়ান। উপকরণে নেই এমন কোনো তথ্য যোগ করবেন না। \
শিক্ষার্থী যদি উপকরণের বাইরের কিছু জিজ্ঞাসা করে, তাহলে বলুন যে এটি এই পাঠের অংশ নয় এবং \
আবার উপকরণে ফিরে আসুন।"
        }
    };
    format!("{}\n{}\n{}\n{}", lead, MATERIAL_BEGIN, material, MATERIAL_END)
}

fn topic_directive(family: LanguageFamily, name: &str) -> String {
    match family {
        LanguageFamily::En => format!("Today's lesson topic is {}.", name),
        LanguageFamily::Bn => format!("আজকের পাঠের বিষয়: {}।", name),
    }
}
