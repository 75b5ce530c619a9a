use serde_json::Value;
use std::path::Path;
use time::OffsetDateTime;
use tracing::debug;
use vigil_core::classify::{classify_mcp, classify_skill};
use vigil_core::config::VigilConfig;
use vigil_core::extract::extract_files_accessed;
use vigil_core::truncate::truncate_output;
use vigil_core::{EventRecord, Record};

use crate::scan::ScanOutcome;

/// Everything needed to assemble one event record.
pub struct CaptureParams<'a> {
    pub tool_name: &'a str,
    pub tool_input: &'a Value,
    pub output_text: &'a str,
    pub timestamp_start: OffsetDateTime,
    pub timestamp_end: OffsetDateTime,
    pub outcome: &'a ScanOutcome,
    pub is_error: bool,
}

fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Capture a completed tool call into the active session's stream.
///
/// Returns `None` when no session is active. The append itself is
/// best-effort; the assembled record is returned either way so callers can
/// still ship it to log sinks.
pub fn capture_event(
    project_dir: &Path,
    config: &VigilConfig,
    params: &CaptureParams<'_>,
) -> Option<EventRecord> {
    let Some(session_id) = vigil_session::get_active_session(project_dir) else {
        debug!("no active session for {}", project_dir.display());
        return None;
    };

    let id = vigil_session::next_event_id(&session_id, project_dir);
    let (tool_output, original_output_size) =
        truncate_output(params.output_text, config.truncation_bytes());
    let duration_ms =
        (params.timestamp_end - params.timestamp_start).whole_milliseconds().max(0) as u64;

    let mcp = classify_mcp(params.tool_name);
    let skill = classify_skill(params.tool_name, params.tool_input);

    let record = EventRecord {
        id,
        timestamp_start: format_rfc3339(params.timestamp_start),
        timestamp_end: format_rfc3339(params.timestamp_end),
        duration_ms,
        tool_name: params.tool_name.to_string(),
        is_mcp: mcp.is_mcp,
        mcp_server: mcp.server,
        mcp_function: mcp.function,
        is_skill: skill.is_skill,
        skill_name: skill.name,
        skill_args: skill.args,
        tool_input: params.tool_input.clone(),
        tool_output,
        is_error: params.is_error,
        working_dir: project_dir.to_string_lossy().to_string(),
        files_accessed: extract_files_accessed(params.tool_name, params.tool_input),
        verdict: params.outcome.verdict,
        severity: params.outcome.severity,
        rules_matched: params.outcome.rules_matched.clone(),
        scan_time_ms: params.outcome.scan_time_ms,
        original_output_size,
    };

    vigil_session::append_record(&session_id, project_dir, &Record::Event(record.clone()));
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_core::{Severity, Verdict};

    fn params<'a>(
        tool_name: &'a str,
        tool_input: &'a Value,
        output_text: &'a str,
        outcome: &'a ScanOutcome,
    ) -> CaptureParams<'a> {
        let start = OffsetDateTime::from_unix_timestamp(1_770_000_000).unwrap();
        CaptureParams {
            tool_name,
            tool_input,
            output_text,
            timestamp_start: start,
            timestamp_end: start + time::Duration::milliseconds(250),
            outcome,
            is_error: false,
        }
    }

    #[test]
    fn capture_appends_to_active_session() {
        let tmp = tempfile::tempdir().unwrap();
        vigil_session::init_session_file("s1", tmp.path()).unwrap();

        let input = json!({"file_path": "/proj/a.rs"});
        let outcome = ScanOutcome {
            verdict: Verdict::Warned,
            severity: Some(Severity::Medium),
            rules_matched: vec!["r1".to_string()],
            scan_time_ms: 4,
            detections: Vec::new(),
        };
        let record = capture_event(
            tmp.path(),
            &VigilConfig::default(),
            &params("Read", &input, "contents", &outcome),
        )
        .unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(record.duration_ms, 250);
        assert_eq!(record.files_accessed, vec!["/proj/a.rs"]);
        assert_eq!(record.verdict, Verdict::Warned);
        assert!(record.timestamp_start.ends_with('Z'));

        let stored = vigil_session::read_session_records("s1", tmp.path());
        assert_eq!(stored.len(), 2); // init + event
    }

    #[test]
    fn capture_without_session_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let input = json!({});
        let outcome = ScanOutcome::default();
        assert!(capture_event(
            tmp.path(),
            &VigilConfig::default(),
            &params("Read", &input, "x", &outcome)
        )
        .is_none());
    }

    #[test]
    fn oversized_output_is_truncated_with_size() {
        let tmp = tempfile::tempdir().unwrap();
        vigil_session::init_session_file("s1", tmp.path()).unwrap();

        let mut config = VigilConfig::default();
        config.output_truncation_kb = 1;
        let big = "z".repeat(4096);
        let input = json!({});
        let outcome = ScanOutcome::default();
        let record = capture_event(
            tmp.path(),
            &config,
            &params("Bash", &input, &big, &outcome),
        )
        .unwrap();

        assert_eq!(record.original_output_size, Some(4096));
        assert!(record.tool_output.contains("[TRUNCATED"));
    }

    #[test]
    fn mcp_classification_flows_into_record() {
        let tmp = tempfile::tempdir().unwrap();
        vigil_session::init_session_file("s1", tmp.path()).unwrap();
        let input = json!({});
        let outcome = ScanOutcome::default();
        let record = capture_event(
            tmp.path(),
            &VigilConfig::default(),
            &params("mcp__github__list_prs", &input, "ok", &outcome),
        )
        .unwrap();
        assert!(record.is_mcp);
        assert_eq!(record.mcp_server.as_deref(), Some("github"));
        assert_eq!(record.mcp_function.as_deref(), Some("list_prs"));
    }
}
