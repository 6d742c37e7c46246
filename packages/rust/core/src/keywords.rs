//! Section keyword suggestion.
//!
//! An external collaborator proposes keyword paths for locating the method
//! and conclusion sections. Replies are free-form text that may or may not
//! be clean JSON, so parsing falls back through: direct JSON, first embedded
//! JSON object, fixed defaults.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use paperdigest_shared::error::Result;

/// First `{...}` block in a reply, matched across newlines.
static JSON_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("json block regex"));

/// Request sent to a keyword source: the document title plus every section
/// title in pre-order.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordRequest {
    pub title: String,
    pub section_titles: Vec<String>,
}

/// Suggested keyword paths per extraction target.
///
/// Each path is staged: the first keyword is matched anywhere in the tree,
/// later keywords only within the previous match's subsections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSuggestion {
    #[serde(default = "default_introduction")]
    pub introduction: Vec<String>,

    #[serde(default = "default_method")]
    pub method: Vec<String>,

    #[serde(default = "default_conclusion")]
    pub conclusion: Vec<String>,
}

impl Default for KeywordSuggestion {
    fn default() -> Self {
        Self {
            introduction: default_introduction(),
            method: default_method(),
            conclusion: default_conclusion(),
        }
    }
}

fn default_introduction() -> Vec<String> {
    vec!["introduction".into()]
}
fn default_method() -> Vec<String> {
    vec!["method".into()]
}
fn default_conclusion() -> Vec<String> {
    vec!["conclusion".into()]
}

/// Parse a collaborator reply into a suggestion.
///
/// Never fails: an unusable reply falls back to the default paths.
pub fn parse_suggestion_reply(reply: &str) -> KeywordSuggestion {
    if let Ok(suggestion) = serde_json::from_str::<KeywordSuggestion>(reply) {
        return suggestion;
    }

    if let Some(block) = JSON_BLOCK_RE.find(reply) {
        if let Ok(suggestion) = serde_json::from_str::<KeywordSuggestion>(block.as_str()) {
            return suggestion;
        }
    }

    debug!("keyword reply not parseable, using default paths");
    KeywordSuggestion::default()
}

/// Source of keyword suggestions for the extraction loop.
///
/// [`DefaultKeywords`] answers offline with the fixed paths; an LLM-backed
/// implementation would format the request into a prompt and run the reply
/// through [`parse_suggestion_reply`].
pub trait KeywordSource: Send + Sync {
    fn suggest(&self, request: &KeywordRequest) -> Result<KeywordSuggestion>;
}

/// Offline keyword source returning the fixed default paths.
pub struct DefaultKeywords;

impl KeywordSource for DefaultKeywords {
    fn suggest(&self, _request: &KeywordRequest) -> Result<KeywordSuggestion> {
        Ok(KeywordSuggestion::default())
    }
}
