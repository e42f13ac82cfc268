// fallacyGuard Data Models
// Detection records plus the frames exchanged with WebSocket clients

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ============ Fallacy Catalogue ============

/// Category tag reported by the model. Tags outside the closed set are kept verbatim
/// in `Unknown` so clients still see what the model said.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FallacyKind {
    AdHominem,
    Strawman,
    FalseDilemma,
    AppealToEmotion,
    SlipperySlope,
    FalseCause,
    HastyGeneralization,
    AppealToAuthority,
    Bandwagon,
    CircularReasoning,
    RedHerring,
    FactualError,
    MisleadingStatistic,
    Equivocation,
    Unknown(String),
}

impl FallacyKind {
    pub const ALL: [FallacyKind; 14] = [
        FallacyKind::AdHominem,
        FallacyKind::Strawman,
        FallacyKind::FalseDilemma,
        FallacyKind::AppealToEmotion,
        FallacyKind::SlipperySlope,
        FallacyKind::FalseCause,
        FallacyKind::HastyGeneralization,
        FallacyKind::AppealToAuthority,
        FallacyKind::Bandwagon,
        FallacyKind::CircularReasoning,
        FallacyKind::RedHerring,
        FallacyKind::FactualError,
        FallacyKind::MisleadingStatistic,
        FallacyKind::Equivocation,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ad_hominem" => Self::AdHominem,
            "strawman" => Self::Strawman,
            "false_dilemma" => Self::FalseDilemma,
            "appeal_to_emotion" => Self::AppealToEmotion,
            "slippery_slope" => Self::SlipperySlope,
            "false_cause" => Self::FalseCause,
            "hasty_generalization" => Self::HastyGeneralization,
            "appeal_to_authority" => Self::AppealToAuthority,
            "bandwagon" => Self::Bandwagon,
            "circular_reasoning" => Self::CircularReasoning,
            "red_herring" => Self::RedHerring,
            "factual_error" => Self::FactualError,
            "misleading_statistic" => Self::MisleadingStatistic,
            "equivocation" => Self::Equivocation,
            _ => Self::Unknown(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::AdHominem => "ad_hominem",
            Self::Strawman => "strawman",
            Self::FalseDilemma => "false_dilemma",
            Self::AppealToEmotion => "appeal_to_emotion",
            Self::SlipperySlope => "slippery_slope",
            Self::FalseCause => "false_cause",
            Self::HastyGeneralization => "hasty_generalization",
            Self::AppealToAuthority => "appeal_to_authority",
            Self::Bandwagon => "bandwagon",
            Self::CircularReasoning => "circular_reasoning",
            Self::RedHerring => "red_herring",
            Self::FactualError => "factual_error",
            Self::MisleadingStatistic => "misleading_statistic",
            Self::Equivocation => "equivocation",
            Self::Unknown(tag) => tag.as_str(),
        }
    }

    /// One-line description used when the prompt enumerates the catalogue.
    pub fn description(&self) -> Option<&'static str> {
        let text = match self {
            Self::AdHominem => "Attacking the person instead of their argument",
            Self::Strawman => "Misrepresenting someone's argument to make it easier to attack",
            Self::FalseDilemma => "Presenting two options when more exist",
            Self::AppealToEmotion => "Using emotion to persuade rather than logic",
            Self::SlipperySlope => "Claiming one event will inevitably lead to another",
            Self::FalseCause => "Assuming causation from correlation",
            Self::HastyGeneralization => "Making broad conclusions from limited evidence",
            Self::AppealToAuthority => "Using authority as evidence when it's not relevant",
            Self::Bandwagon => "Assuming something is true because many people believe it",
            Self::CircularReasoning => "Using a conclusion as evidence for itself",
            Self::RedHerring => "Diverting attention from the main issue",
            Self::FactualError => "Stating incorrect factual information",
            Self::MisleadingStatistic => "Using statistics in a misleading way",
            Self::Equivocation => "Using ambiguous language to mislead",
            Self::Unknown(_) => return None,
        };
        Some(text)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for FallacyKind {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<FallacyKind> for String {
    fn from(kind: FallacyKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FallacyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Anything outside low/medium/high falls back to `Low`.
    pub fn from_str(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

// ============ Detection Records ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallacyRecord {
    #[serde(rename = "type")]
    pub kind: FallacyKind,
    #[serde(rename = "name")]
    pub label: String,
    pub severity: Severity,
    pub confidence: f64,
    pub explanation: String,
    #[serde(rename = "text_span")]
    pub span_text: String,
    /// Character offset claimed by the model; never checked against the input.
    #[serde(rename = "start_index", default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<i64>,
    #[serde(rename = "end_index", default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<i64>,
}

pub const DEFAULT_FALLACY_LABEL: &str = "Unknown Fallacy";
pub const UNKNOWN_KIND_TAG: &str = "unknown";

impl Default for FallacyRecord {
    fn default() -> Self {
        Self {
            kind: FallacyKind::Unknown(UNKNOWN_KIND_TAG.to_string()),
            label: DEFAULT_FALLACY_LABEL.to_string(),
            severity: Severity::Low,
            confidence: 0.0,
            explanation: String::new(),
            span_text: String::new(),
            start_offset: None,
            end_offset: None,
        }
    }
}

/// Result of analysing one text fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionOutcome {
    pub has_issues: bool,
    pub records: Vec<FallacyRecord>,
    pub overall_confidence: f64,
    pub summary: Option<String>,
    /// Set only when the pipeline failed; records are then always empty.
    pub failure: Option<String>,
}

impl DetectionOutcome {
    pub fn degraded(failure: impl Into<String>) -> Self {
        Self {
            failure: Some(failure.into()),
            ..Self::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

// ============ Client Frames ============

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Text {
        #[serde(default)]
        text: String,
        #[serde(default, deserialize_with = "lenient")]
        speaker: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        timestamp: Option<f64>,
    },
    Ping,
}

/// Optional client metadata: a value of the wrong type reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// ============ Server Events ============

pub const FALLACY_DETECTION_EVENT: &str = "fallacy_detection";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub text: String,
    pub fallacies: Vec<FallacyRecord>,
    pub has_fallacies: bool,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionEvent {
    pub fn from_outcome(text: &str, speaker: Option<String>, outcome: DetectionOutcome) -> Self {
        Self {
            event_type: FALLACY_DETECTION_EVENT.to_string(),
            text: text.to_string(),
            fallacies: outcome.records,
            has_fallacies: outcome.has_issues,
            confidence: outcome.overall_confidence,
            analysis: outcome.summary,
            speaker,
            error: outcome.failure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Every frame the server pushes to a client. Each variant serializes to the
/// bare payload with no envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerEvent {
    Connected {
        status: String,
    },
    Pong {
        #[serde(rename = "type")]
        event_type: String,
    },
    Detection(DetectionEvent),
    Error(ErrorEvent),
}

impl ServerEvent {
    pub fn connected() -> Self {
        Self::Connected {
            status: "connected".to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::Pong {
            event_type: "pong".to_string(),
        }
    }

    pub fn error(message: impl Into<String>, text: Option<String>) -> Self {
        Self::Error(ErrorEvent {
            error: message.into(),
            text,
        })
    }

    pub fn detection(text: &str, speaker: Option<String>, outcome: DetectionOutcome) -> Self {
        Self::Detection(DetectionEvent::from_outcome(text, speaker, outcome))
    }
}
