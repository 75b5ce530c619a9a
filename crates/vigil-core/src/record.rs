use serde::{Deserialize, Serialize};

/// Coarse classification assigned to one tool call from scanner detections.
///
/// `ScanFailed` is distinct from `Allowed`: it means the scan itself errored,
/// not that nothing was found. Audit consumers must never fold the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    #[default]
    Allowed,
    Warned,
    Blocked,
    ScanFailed,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allowed => "allowed",
            Verdict::Warned => "warned",
            Verdict::Blocked => "blocked",
            Verdict::ScanFailed => "scan_failed",
        }
    }
}

/// Detection severity. Ordering matches escalation: low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// One detection reported by the external scanner.
///
/// Only `rule_name` and `severity` are interpreted here; the remaining fields
/// pass through opaquely for reporting. `severity` stays a raw string because
/// unrecognized values have defined fallback behavior (see `verdict`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Detection {
    pub rule_name: Option<String>,
    pub severity: Option<String>,
    pub description: String,
    pub category: String,
    pub matched_keywords: Vec<String>,
    pub matched_semantics: Vec<String>,
    pub llm_match: bool,
    pub confidence: f64,
}

/// First line of every record stream. Written once, never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitRecord {
    pub session_id: String,
    pub timestamp: String,
    pub platform: String,
    pub project_dir: String,
}

/// One persisted entry describing a single completed tool invocation.
///
/// Field defaults are lenient so streams written by older versions still
/// deserialize. Immutable once appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    pub id: u64,
    pub timestamp_start: String,
    pub timestamp_end: String,
    pub duration_ms: u64,
    pub tool_name: String,
    pub is_mcp: bool,
    pub mcp_server: Option<String>,
    pub mcp_function: Option<String>,
    pub is_skill: bool,
    pub skill_name: Option<String>,
    pub skill_args: Option<String>,
    pub tool_input: serde_json::Value,
    pub tool_output: String,
    pub is_error: bool,
    pub working_dir: String,
    pub files_accessed: Vec<String>,
    #[serde(rename = "nova_verdict")]
    pub verdict: Verdict,
    #[serde(rename = "nova_severity")]
    pub severity: Option<Severity>,
    #[serde(rename = "nova_rules_matched")]
    pub rules_matched: Vec<String>,
    #[serde(rename = "nova_scan_time_ms")]
    pub scan_time_ms: u64,
    /// Present only when `tool_output` was truncated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_output_size: Option<usize>,
}

/// One user prompt submitted during the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptRecord {
    pub id: u64,
    pub timestamp: String,
    pub prompt: String,
    pub prompt_length: u64,
}

/// A single line of a record stream, discriminated by its `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Init(InitRecord),
    Event(EventRecord),
    UserPrompt(PromptRecord),
}

impl Record {
    /// Integer record ID, for the kinds that carry one.
    pub fn id(&self) -> Option<u64> {
        match self {
            Record::Init(_) => None,
            Record::Event(e) => Some(e.id),
            Record::UserPrompt(p) => Some(p.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_round_trips_snake_case() {
        let json = serde_json::to_string(&Verdict::ScanFailed).unwrap();
        assert_eq!(json, "\"scan_failed\"");
        let back: Verdict = serde_json::from_str("\"warned\"").unwrap();
        assert_eq!(back, Verdict::Warned);
    }

    #[test]
    fn severity_ordering_escalates() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn event_record_uses_wire_field_names() {
        let event = EventRecord {
            id: 3,
            tool_name: "Read".to_string(),
            verdict: Verdict::Warned,
            severity: Some(Severity::Medium),
            rules_matched: vec!["rule_a".to_string()],
            scan_time_ms: 12,
            ..Default::default()
        };
        let json = serde_json::to_value(Record::Event(event)).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["nova_verdict"], "warned");
        assert_eq!(json["nova_severity"], "medium");
        assert_eq!(json["nova_rules_matched"][0], "rule_a");
        assert_eq!(json["nova_scan_time_ms"], 12);
        assert!(json.get("original_output_size").is_none());
    }

    #[test]
    fn truncated_event_serializes_original_size() {
        let event = EventRecord {
            original_output_size: Some(20480),
            ..Default::default()
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["original_output_size"], 20480);
    }

    #[test]
    fn record_tag_discriminates_kinds() {
        let line = r#"{"type":"user_prompt","id":2,"timestamp":"2026-02-01T10:00:00Z","prompt":"hi","prompt_length":2}"#;
        let record: Record = serde_json::from_str(line).unwrap();
        match record {
            Record::UserPrompt(p) => {
                assert_eq!(p.id, 2);
                assert_eq!(p.prompt_length, 2);
            }
            other => panic!("expected user_prompt, got {other:?}"),
        }
    }

    #[test]
    fn sparse_event_deserializes_with_defaults() {
        let line = r#"{"type":"event","id":1,"tool_name":"Bash"}"#;
        let record: Record = serde_json::from_str(line).unwrap();
        match record {
            Record::Event(e) => {
                assert_eq!(e.verdict, Verdict::Allowed);
                assert!(e.severity.is_none());
                assert!(e.files_accessed.is_empty());
                assert!(!e.is_error);
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn detection_tolerates_missing_fields() {
        let d: Detection = serde_json::from_str(r#"{"rule_name":"r1"}"#).unwrap();
        assert_eq!(d.rule_name.as_deref(), Some("r1"));
        assert!(d.severity.is_none());
        assert!(!d.llm_match);
    }
}
