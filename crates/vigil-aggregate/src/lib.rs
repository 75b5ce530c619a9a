use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;
use vigil_core::{EventRecord, InitRecord, PromptRecord, Record, Verdict};

/// Aggregate statistics over one session's record stream.
///
/// Recomputed on demand; a pure function of the stream contents, so running
/// it twice over the same stream yields identical results. Maps are sorted
/// so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_events: u64,
    pub user_prompts: u64,
    pub total_prompt_chars: u64,
    pub tools_used: BTreeMap<String, u64>,
    pub files_touched: u64,
    pub warnings: u64,
    pub blocked: u64,
    pub duration_seconds: u64,
    pub mcp_calls: u64,
    pub mcp_servers: BTreeMap<String, u64>,
    pub mcp_errors: u64,
    pub skill_calls: u64,
    pub skills_used: BTreeMap<String, u64>,
    pub skill_errors: u64,
}

/// Token/duration estimate derived from captured events alone.
///
/// Uses the ~4 chars per token heuristic; not API-reported usage, hence the
/// always-true `is_estimate` flag consumers must surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub estimated_input_tokens: u64,
    pub estimated_output_tokens: u64,
    pub tool_calls: u64,
    pub total_duration_ms: u64,
    pub is_estimate: bool,
}

impl Default for ActivityMetrics {
    fn default() -> Self {
        Self {
            estimated_input_tokens: 0,
            estimated_output_tokens: 0,
            tool_calls: 0,
            total_duration_ms: 0,
            is_estimate: true,
        }
    }
}

/// Summary block of the session object: the stats plus an optional
/// AI-generated prose summary filled in by the report layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub ai_summary: Option<String>,
    #[serde(flatten)]
    pub stats: SessionStats,
}

/// The read-only contract handed to report rendering and summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionObject {
    pub session_id: String,
    pub session_start: String,
    pub session_end: String,
    pub platform: String,
    pub project_dir: String,
    pub events: Vec<Record>,
    pub summary: SessionSummary,
}

fn iter_events(records: &[Record]) -> impl Iterator<Item = &EventRecord> {
    records.iter().filter_map(|r| match r {
        Record::Event(e) => Some(e),
        _ => None,
    })
}

fn iter_prompts(records: &[Record]) -> impl Iterator<Item = &PromptRecord> {
    records.iter().filter_map(|r| match r {
        Record::UserPrompt(p) => Some(p),
        _ => None,
    })
}

fn find_init(records: &[Record]) -> Option<&InitRecord> {
    records.iter().find_map(|r| match r {
        Record::Init(i) => Some(i),
        _ => None,
    })
}

/// Fold a record stream into session statistics.
pub fn session_statistics(records: &[Record]) -> SessionStats {
    let mut stats = SessionStats::default();
    let mut all_files: BTreeSet<&str> = BTreeSet::new();

    for prompt in iter_prompts(records) {
        stats.user_prompts += 1;
        stats.total_prompt_chars += prompt.prompt_length;
    }

    let mut last_event_end: Option<&str> = None;
    for event in iter_events(records) {
        stats.total_events += 1;

        let tool = if event.tool_name.is_empty() {
            "unknown"
        } else {
            event.tool_name.as_str()
        };
        *stats.tools_used.entry(tool.to_string()).or_insert(0) += 1;

        all_files.extend(event.files_accessed.iter().map(String::as_str));

        // scan_failed deliberately counts in neither bucket
        match event.verdict {
            Verdict::Warned => stats.warnings += 1,
            Verdict::Blocked => stats.blocked += 1,
            Verdict::Allowed | Verdict::ScanFailed => {}
        }

        if event.is_mcp {
            stats.mcp_calls += 1;
            let server = event.mcp_server.as_deref().unwrap_or("unknown");
            *stats.mcp_servers.entry(server.to_string()).or_insert(0) += 1;
            if event.is_error {
                stats.mcp_errors += 1;
            }
        }

        if event.is_skill {
            stats.skill_calls += 1;
            let skill = event.skill_name.as_deref().unwrap_or("unknown");
            *stats.skills_used.entry(skill.to_string()).or_insert(0) += 1;
            if event.is_error {
                stats.skill_errors += 1;
            }
        }

        last_event_end = Some(event.timestamp_end.as_str());
    }

    stats.files_touched = all_files.len() as u64;

    if let (Some(init), Some(end)) = (find_init(records), last_event_end) {
        stats.duration_seconds = duration_seconds_between(&init.timestamp, end);
    }

    stats
}

/// Whole seconds between two RFC 3339 timestamps, floored. Zero when either
/// timestamp is missing, unparsable, or out of order. Never an error.
pub fn duration_seconds_between(start: &str, end: &str) -> u64 {
    if start.is_empty() || end.is_empty() {
        return 0;
    }
    let rfc3339 = &time::format_description::well_known::Rfc3339;
    let (Ok(start), Ok(end)) = (
        time::OffsetDateTime::parse(start, rfc3339),
        time::OffsetDateTime::parse(end, rfc3339),
    ) else {
        return 0;
    };
    (end - start).whole_seconds().max(0) as u64
}

/// Estimate activity from captured events: serialized input/output character
/// counts at ~4 chars per token, plus summed per-event durations.
pub fn estimate_activity_metrics(records: &[Record]) -> ActivityMetrics {
    let mut metrics = ActivityMetrics::default();
    let mut input_chars: u64 = 0;
    let mut output_chars: u64 = 0;

    for event in iter_events(records) {
        metrics.tool_calls += 1;

        let empty_input = match &event.tool_input {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if !empty_input {
            if let Ok(serialized) = serde_json::to_string(&event.tool_input) {
                input_chars += serialized.chars().count() as u64;
            }
        }

        output_chars += event.tool_output.chars().count() as u64;
        metrics.total_duration_ms += event.duration_ms;
    }

    metrics.estimated_input_tokens = input_chars / 4;
    metrics.estimated_output_tokens = output_chars / 4;
    metrics
}

/// Assemble the complete session object for report generation.
///
/// Always returns an object: a missing or unreadable stream yields one with
/// no events and all-zero statistics.
pub fn build_session_object(
    session_id: &str,
    project_dir: &Path,
    session_end_time: Option<&str>,
) -> SessionObject {
    let records = vigil_session::read_session_records(session_id, project_dir);
    debug!("building session object from {} records", records.len());

    let stats = session_statistics(&records);
    let init = find_init(&records).cloned();
    let events: Vec<Record> = records
        .into_iter()
        .filter(|r| matches!(r, Record::Event(_) | Record::UserPrompt(_)))
        .collect();

    let session_end = match session_end_time {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => vigil_session::now_rfc3339(),
    };

    SessionObject {
        session_id: session_id.to_string(),
        session_start: init
            .as_ref()
            .map(|i| i.timestamp.clone())
            .unwrap_or_default(),
        session_end,
        platform: init
            .as_ref()
            .map(|i| i.platform.clone())
            .unwrap_or_else(|| std::env::consts::OS.to_string()),
        project_dir: init
            .as_ref()
            .map(|i| i.project_dir.clone())
            .unwrap_or_else(|| project_dir.to_string_lossy().to_string()),
        events,
        summary: SessionSummary {
            ai_summary: None,
            stats,
        },
    }
}
