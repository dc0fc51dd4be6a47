//! Request/response shapes for the content and code generators.

use serde::{Deserialize, Serialize};

/// Requested blog length. Unknown values fall back to `Medium`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlogLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl BlogLength {
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("short") => Self::Short,
            Some("long") => Self::Long,
            _ => Self::Medium,
        }
    }

    /// Word-count instruction handed to the model.
    pub fn word_range(&self) -> &'static str {
        match self {
            Self::Short => "300-400 words",
            Self::Medium => "600-800 words",
            Self::Long => "1200-1500 words",
        }
    }
}

/// Requested writing style. Unknown values fall back to `Informative`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStyle {
    #[default]
    Informative,
    Casual,
    Professional,
    Creative,
}

impl BlogStyle {
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("casual") => Self::Casual,
            Some("professional") => Self::Professional,
            Some("creative") => Self::Creative,
            _ => Self::Informative,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlogRequest {
    pub topic: String,
    #[serde(default)]
    pub length: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

/// Generated (or fallback) blog post. Exactly one of `model` / `note` is set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlogResponse {
    pub content: String,
    pub topic: String,
    pub length: BlogLength,
    pub style: BlogStyle,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub const DEFAULT_CODE_LANGUAGE: &str = "python";

fn default_language() -> String {
    DEFAULT_CODE_LANGUAGE.to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct CodeRequest {
    pub description: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Generated (or fallback) code. Exactly one of `model` / `note` is set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CodeResponse {
    pub code: String,
    pub language: String,
    pub description: String,
    pub explanation: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Number of whitespace-separated tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

const TITLE_MAX_CHARS: usize = 50;

/// Snippet title: the description, cut to 50 characters with an ellipsis when longer.
pub fn snippet_title(description: &str) -> String {
    if description.chars().count() > TITLE_MAX_CHARS {
        let head: String = description.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        description.to_string()
    }
}
