// Response Normalizer
// Strips code fences from a model reply and parses what remains as JSON.
// No schema checks here; field coercion lives in the assembler.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// Characters of the offending reply kept in a parse error.
pub const PARSE_PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Invalid JSON response from model: {reason}. Response: {preview}")]
    InvalidJson { reason: String, preview: String },
}

fn opening_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[A-Za-z0-9_+-]*").expect("opening fence regex"))
}

/// Remove one leading fence (```` ``` ```` or ```` ```json ````) and one trailing fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(m) = opening_fence_re().find(text) {
        text = &text[m.end()..];
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

pub fn normalize_reply(raw: &str) -> Result<Value, NormalizeError> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(cleaned).map_err(|e| NormalizeError::InvalidJson {
        reason: e.to_string(),
        preview: cleaned.chars().take(PARSE_PREVIEW_CHARS).collect(),
    })
}
