// Detection prompts
// The system instruction lists the fallacy catalogue and pins the reply schema.

use std::sync::OnceLock;

use crate::models::FallacyKind;

const SYSTEM_PREAMBLE: &str = "You are an expert at detecting logical fallacies and factual errors in text.
Analyze the following text and identify any fallacies or factual inaccuracies.";

const SYSTEM_INSTRUCTIONS: &str = "For each fallacy found, provide:
- The type of fallacy (use the exact names listed above)
- A human-readable name for the fallacy
- Severity (low, medium, or high)
- Confidence (0.0 to 1.0)
- An explanation of why this is a fallacy
- The exact text span where the fallacy occurs
- Start and end character indices

If no fallacies are found, return an empty list. Be thorough but fair - only flag clear fallacies.
IMPORTANT: You must respond ONLY with valid JSON, no other text.";

const REPLY_SCHEMA: &str = r#"{
    "has_fallacies": true/false,
    "fallacies": [
        {
            "type": "fallacy_type",
            "name": "Human readable name",
            "severity": "low|medium|high",
            "confidence": 0.0-1.0,
            "explanation": "Explanation of the fallacy",
            "text_span": "Exact text containing the fallacy",
            "start_index": 0,
            "end_index": 10
        }
    ],
    "confidence": 0.0-1.0,
    "analysis": "Brief overall analysis"
}"#;

pub fn system_prompt() -> &'static str {
    static PROMPT: OnceLock<String> = OnceLock::new();
    PROMPT.get_or_init(|| {
        let mut prompt = String::from(SYSTEM_PREAMBLE);
        prompt.push_str("\n\nFallacy types:\n");
        for kind in FallacyKind::ALL.iter() {
            prompt.push_str(&format!(
                "- {}: {}\n",
                kind.as_str(),
                kind.description().unwrap_or_default()
            ));
        }
        prompt.push('\n');
        prompt.push_str(SYSTEM_INSTRUCTIONS);
        prompt
    })
}

pub fn user_prompt(text: &str) -> String {
    format!(
        "Analyze this text for fallacies and factual errors:\n\n{}\n\nRespond in JSON format with this structure:\n{}",
        text, REPLY_SCHEMA
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_lists_every_kind() {
        let prompt = system_prompt();
        for kind in FallacyKind::ALL.iter() {
            assert!(prompt.contains(kind.as_str()), "missing {}", kind);
        }
        assert!(prompt.contains("ONLY with valid JSON"));
    }

    #[test]
    fn test_user_prompt_embeds_text() {
        let prompt = user_prompt("Everyone knows this is true.");
        assert!(prompt.contains("Everyone knows this is true."));
        assert!(prompt.contains("\"has_fallacies\""));
        assert!(prompt.contains("\"text_span\""));
    }
}
