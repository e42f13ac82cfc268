// Detection Result Assembler
// Turns the loosely-typed reply document into a DetectionOutcome. Never fails:
// every field that is missing or wrong-typed takes its default on its own.

use serde_json::{Map, Value};

use crate::models::{
    DetectionOutcome, FallacyKind, FallacyRecord, Severity, DEFAULT_FALLACY_LABEL,
    UNKNOWN_KIND_TAG,
};

pub fn assemble_outcome(document: &Value) -> DetectionOutcome {
    let empty = Map::new();
    let root = document.as_object().unwrap_or(&empty);

    let records = root
        .get("fallacies")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(assemble_record).collect())
        .unwrap_or_default();

    DetectionOutcome {
        has_issues: root
            .get("has_fallacies")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        records,
        overall_confidence: confidence_or_zero(root.get("confidence")),
        summary: root
            .get("analysis")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
        failure: None,
    }
}

/// A non-object element still yields a record, built entirely from defaults.
fn assemble_record(item: &Value) -> FallacyRecord {
    let empty = Map::new();
    let fields = item.as_object().unwrap_or(&empty);

    FallacyRecord {
        kind: kind_or_unknown(fields.get("type")),
        label: text_or(fields.get("name"), DEFAULT_FALLACY_LABEL),
        severity: severity_or_low(fields.get("severity")),
        confidence: confidence_or_zero(fields.get("confidence")),
        explanation: text_or(fields.get("explanation"), ""),
        span_text: text_or(fields.get("text_span"), ""),
        start_offset: offset_or_none(fields.get("start_index")),
        end_offset: offset_or_none(fields.get("end_index")),
    }
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn kind_or_unknown(value: Option<&Value>) -> FallacyKind {
    value
        .and_then(Value::as_str)
        .map(FallacyKind::from_tag)
        .unwrap_or_else(|| FallacyKind::Unknown(UNKNOWN_KIND_TAG.to_string()))
}

fn severity_or_low(value: Option<&Value>) -> Severity {
    value
        .and_then(Value::as_str)
        .map(Severity::from_str)
        .unwrap_or_default()
}

/// Numbers and numeric strings are accepted as-is (no clamping); anything else is 0.0.
pub fn confidence_or_zero(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|c| c.is_finite()).unwrap_or(0.0)
}

/// Integers, integral floats and integer strings; anything else is absent.
fn offset_or_none(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detection::normalizer::normalize_reply;
    use serde_json::json;

    fn ad_hominem_reply() -> Value {
        json!({
            "has_fallacies": true,
            "fallacies": [{
                "type": "ad_hominem",
                "name": "Ad Hominem Attack",
                "severity": "high",
                "confidence": 0.95,
                "explanation": "Attacking the person",
                "text_span": "You're an idiot",
                "start_index": 0,
                "end_index": 15
            }],
            "confidence": 0.95,
            "analysis": "Found one fallacy"
        })
    }

    #[test]
    fn test_well_formed_reply() {
        let outcome = assemble_outcome(&ad_hominem_reply());
        assert!(outcome.has_issues);
        assert_eq!(outcome.overall_confidence, 0.95);
        assert_eq!(outcome.summary.as_deref(), Some("Found one fallacy"));
        assert!(outcome.failure.is_none());

        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.kind, FallacyKind::AdHominem);
        assert_eq!(record.label, "Ad Hominem Attack");
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.confidence, 0.95);
        assert_eq!(record.span_text, "You're an idiot");
        assert_eq!(record.start_offset, Some(0));
        assert_eq!(record.end_offset, Some(15));
    }

    #[test]
    fn test_fenced_and_direct_replies_agree() {
        let direct = ad_hominem_reply().to_string();
        let fenced = format!("```json\n{}\n```", direct);
        let a = assemble_outcome(&normalize_reply(&direct).unwrap());
        let b = assemble_outcome(&normalize_reply(&fenced).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let document = json!({
            "has_fallacies": "yes",
            "fallacies": [{"type": "bandwagon", "confidence": "high"}, 7],
            "confidence": ""
        });
        assert_eq!(assemble_outcome(&document), assemble_outcome(&document));
    }

    #[test]
    fn test_malformed_confidence_is_zero() {
        for bad in [json!(""), json!("very sure"), json!(null), json!(true), json!([0.5])] {
            let document = json!({"fallacies": [{"confidence": bad.clone()}], "confidence": bad});
            let outcome = assemble_outcome(&document);
            assert_eq!(outcome.overall_confidence, 0.0);
            assert_eq!(outcome.records[0].confidence, 0.0);
        }

        let outcome = assemble_outcome(&json!({"fallacies": [{}]}));
        assert_eq!(outcome.records[0].confidence, 0.0);
        assert_eq!(outcome.overall_confidence, 0.0);
    }

    #[test]
    fn test_confidence_is_not_clamped() {
        assert_eq!(confidence_or_zero(Some(&json!(1.7))), 1.7);
        assert_eq!(confidence_or_zero(Some(&json!(-0.2))), -0.2);
        assert_eq!(confidence_or_zero(Some(&json!(" 0.8 "))), 0.8);
        assert_eq!(confidence_or_zero(Some(&json!("NaN"))), 0.0);
    }

    #[test]
    fn test_unknown_severity_is_low() {
        for raw in [json!("critical"), json!(3), json!(null)] {
            let outcome = assemble_outcome(&json!({"fallacies": [{"severity": raw}]}));
            assert_eq!(outcome.records[0].severity, Severity::Low);
        }
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let outcome = assemble_outcome(&json!({
            "fallacies": [{"type": "tu_quoque"}, {"type": 12}, {}]
        }));
        assert_eq!(outcome.records[0].kind, FallacyKind::Unknown("tu_quoque".to_string()));
        assert_eq!(outcome.records[1].kind.as_str(), "unknown");
        assert_eq!(outcome.records[2].kind.as_str(), "unknown");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let outcome = assemble_outcome(&json!({"fallacies": [{"type": "strawman"}, "oops"]}));
        assert!(!outcome.has_issues);
        assert!(outcome.summary.is_none());
        assert_eq!(outcome.records.len(), 2);

        let record = &outcome.records[0];
        assert_eq!(record.kind, FallacyKind::Strawman);
        assert_eq!(record.label, DEFAULT_FALLACY_LABEL);
        assert_eq!(record.explanation, "");
        assert_eq!(record.span_text, "");
        assert_eq!(record.start_offset, None);
        assert_eq!(record.end_offset, None);

        assert_eq!(outcome.records[1], FallacyRecord::default());
    }

    #[test]
    fn test_fallacies_not_a_list() {
        let outcome = assemble_outcome(&json!({"has_fallacies": true, "fallacies": "none"}));
        assert!(outcome.has_issues);
        assert!(outcome.records.is_empty());

        let outcome = assemble_outcome(&json!([1, 2, 3]));
        assert_eq!(outcome, DetectionOutcome::default());
    }

    #[test]
    fn test_offsets_are_passed_through() {
        let outcome = assemble_outcome(&json!({
            "fallacies": [
                {"start_index": 40, "end_index": 5},
                {"start_index": 3.0, "end_index": "9"},
                {"start_index": 2.5, "end_index": "end"}
            ]
        }));
        assert_eq!(outcome.records[0].start_offset, Some(40));
        assert_eq!(outcome.records[0].end_offset, Some(5));
        assert_eq!(outcome.records[1].start_offset, Some(3));
        assert_eq!(outcome.records[1].end_offset, Some(9));
        assert_eq!(outcome.records[2].start_offset, None);
        assert_eq!(outcome.records[2].end_offset, None);
    }

    #[test]
    fn test_records_keep_model_order() {
        let outcome = assemble_outcome(&json!({
            "fallacies": [
                {"type": "red_herring", "confidence": 0.2},
                {"type": "false_cause", "confidence": 0.9},
                {"type": "equivocation", "confidence": 0.5}
            ]
        }));
        let kinds: Vec<&str> = outcome.records.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["red_herring", "false_cause", "equivocation"]);
    }
}
