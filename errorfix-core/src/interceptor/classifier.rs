//! Safety gate for canonical input.
//!
//! Classification is a pure function of the text and the loaded
//! [`ContentPolicy`]. Rules run in a fixed order and the first hit wins:
//! Empty, Greeting, Malicious, NonMeaningful, Valid. Malicious runs before
//! NonMeaningful so a short unsafe payload is reported as unsafe.
//!
//! Malicious patterns are textual risk indicators. Nothing here executes
//! input; the gate keeps hostile payloads away from the completion service
//! and from any consumer that might render results unsafely.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::normalization::Normalizer;

/// Inputs with fewer alphanumeric characters than this are noise.
pub const MIN_MEANINGFUL_CHARS: usize = 3;

pub const DEFAULT_GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "help",
    "start",
    "good morning",
    "good afternoon",
    "good evening",
    "what can you do",
    "what are you",
    "who are you",
    "about you",
    "what are you configured to do",
];

/// Versioned detection list: (id, pattern). Matching is case-insensitive.
pub const DEFAULT_MALICIOUS_PATTERNS: &[(&str, &str)] = &[
    ("script_tag", r"(?s)<script.*?>.*?</script>"),
    ("php_tag", r"(?s)<\?php.*?\?>"),
    ("eval_call", r"eval\s*\(.*\)"),
    ("base64_decode", r"base64_decode\s*\("),
    ("system_call", r"system\s*\("),
    ("rm_rf", r"rm\s+-rf"),
    ("drop_table", r"DROP\s+TABLE"),
];

static DEFAULT_POLICY: Lazy<ContentPolicy> =
    Lazy::new(|| ContentPolicy::builtin().expect("built-in content policy compiles"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid pattern '{id}': {reason}")]
    InvalidPattern { id: String, reason: String },
    #[error("greeting phrase must not be blank")]
    BlankGreeting,
}

/// One entry of the malicious-pattern list, as stored in policy manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub id: String,
    pub pattern: String,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    id: String,
    regex: Regex,
}

/// Phrase and pattern lists the classifier evaluates. Data, not code.
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    greetings: Vec<Regex>,
    malicious: Vec<CompiledPattern>,
}

impl ContentPolicy {
    pub fn new(greetings: &[String], patterns: &[PatternSpec]) -> Result<Self, PolicyError> {
        let greetings = greetings
            .iter()
            .map(|phrase| greeting_regex(phrase))
            .collect::<Result<Vec<_>, _>>()?;

        let malicious = patterns
            .iter()
            .map(|spec| {
                RegexBuilder::new(&spec.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| CompiledPattern {
                        id: spec.id.clone(),
                        regex,
                    })
                    .map_err(|e| PolicyError::InvalidPattern {
                        id: spec.id.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            greetings,
            malicious,
        })
    }

    pub fn builtin() -> Result<Self, PolicyError> {
        let greetings: Vec<String> = DEFAULT_GREETINGS.iter().map(|s| s.to_string()).collect();
        Self::new(&greetings, &default_pattern_specs())
    }

    pub fn is_greeting(&self, text: &str) -> bool {
        self.greetings.iter().any(|re| re.is_match(text))
    }

    /// Id of the first malicious pattern that matches, in list order.
    pub fn malicious_match(&self, text: &str) -> Option<&str> {
        self.malicious
            .iter()
            .find(|p| p.regex.is_match(text))
            .map(|p| p.id.as_str())
    }

    pub fn pattern_count(&self) -> usize {
        self.malicious.len()
    }
}

impl Default for ContentPolicy {
    fn default() -> Self {
        DEFAULT_POLICY.clone()
    }
}

pub fn default_pattern_specs() -> Vec<PatternSpec> {
    DEFAULT_MALICIOUS_PATTERNS
        .iter()
        .map(|(id, pattern)| PatternSpec {
            id: id.to_string(),
            pattern: pattern.to_string(),
        })
        .collect()
}

/// Phrases match as whole words, so "hi" does not fire inside "this".
///
/// A boundary is only required on a side that ends in a word character;
/// `\b` next to `+` or `?` would never match.
fn greeting_regex(phrase: &str) -> Result<Regex, PolicyError> {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return Err(PolicyError::BlankGreeting);
    }
    let trimmed = phrase.trim();
    let lead = if trimmed.chars().next().is_some_and(is_word_char) { r"\b" } else { "" };
    let tail = if trimmed.chars().last().is_some_and(is_word_char) { r"\b" } else { "" };
    let pattern = format!("{lead}{}{tail}", words.join(r"\s+"));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| PolicyError::InvalidPattern {
            id: phrase.to_string(),
            reason: e.to_string(),
        })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Empty,
    Greeting,
    Malicious,
    NonMeaningful,
    Valid,
}

impl Classification {
    pub fn is_valid(self) -> bool {
        matches!(self, Classification::Valid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Empty => "empty",
            Classification::Greeting => "greeting",
            Classification::Malicious => "malicious",
            Classification::NonMeaningful => "non_meaningful",
            Classification::Valid => "valid",
        }
    }
}

/// A classification together with the text it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedInput {
    pub classification: Classification,
    pub text: String,
    /// Set when `classification` is `Malicious`.
    pub matched_pattern: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SafetyClassifier {
    policy: ContentPolicy,
}

impl SafetyClassifier {
    pub fn new(policy: ContentPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    pub fn classify(&self, text: &str) -> Classification {
        self.inspect(text).classification
    }

    pub fn inspect(&self, text: &str) -> ClassifiedInput {
        let (classification, matched_pattern) = self.evaluate(text);
        ClassifiedInput {
            classification,
            text: text.to_string(),
            matched_pattern,
        }
    }

    fn evaluate(&self, text: &str) -> (Classification, Option<String>) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return (Classification::Empty, None);
        }

        let view = Normalizer::normalize(trimmed);
        let stripped = Normalizer::strip_tags(&view);

        if self.policy.is_greeting(&stripped) {
            return (Classification::Greeting, None);
        }

        // Tags are kept here: they are what the script/php patterns look for.
        if let Some(id) = self.policy.malicious_match(&view) {
            return (Classification::Malicious, Some(id.to_string()));
        }

        if meaningful_chars(&stripped) < MIN_MEANINGFUL_CHARS {
            return (Classification::NonMeaningful, None);
        }

        (Classification::Valid, None)
    }
}

fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}
