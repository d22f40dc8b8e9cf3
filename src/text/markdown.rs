//! Markdown removal before speech synthesis
//!
//! Models format replies with markdown even when told not to. The markers
//! would be read aloud, so they are removed while the text is kept.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("invalid markdown pattern"),
            replacement,
        }
    }
}

// Applied in order. Emphasis never spans a line break, so a stray bullet
// asterisk cannot pair with one on the next line.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\*\*([^*\n]+)\*\*", "$1"),
        Rule::new(r"\*([^*\n]+)\*", "$1"),
        Rule::new(r"__([^_\n]+)__", "$1"),
        Rule::new(r"_([^_\n]+)_", "$1"),
        Rule::new(r"```[\s\S]*?```", ""),
        Rule::new(r"`([^`]+)`", "$1"),
        Rule::new(r"\[([^\]]+)\]\([^)]+\)", "$1"),
        Rule::new(r"(?m)^#{1,6}[ \t]+(.+)$", "$1"),
        Rule::new(r"(?m)^[ \t]*[-*+][ \t]+", ""),
        Rule::new(r"(?m)^[ \t]*\d+\.[ \t]+", ""),
        Rule::new(r"(?m)^[-*]{3,}[ \t]*$", ""),
        Rule::new(r"\n\s*\n", "\n\n"),
    ]
});

/// Removes markdown markers, keeping the text they wrap
pub fn strip_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut result = text.to_string();
    for rule in RULES.iter() {
        result = rule
            .pattern
            .replace_all(&result, rule.replacement)
            .into_owned();
    }
    result.trim().to_string()
}
