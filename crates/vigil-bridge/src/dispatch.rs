use serde_json::{json, Value};
use std::path::Path;
use time::OffsetDateTime;
use tracing::{debug, warn};
use vigil_core::config::VigilConfig;
use vigil_core::extract::{detect_error, extract_input_text, extract_text};
use vigil_core::{PromptRecord, Record};

use crate::capture::{capture_event, CaptureParams};
use crate::parse::{get_str, now_rfc3339, parse_hook_stdin, resolve_project_dir};
use crate::scan::{run_scan, should_scan, ScanOutcome, Scanner};
use crate::{guard, sinks, warning};

/// Result from a hook dispatch.
///
/// - `stdout`: JSON printed for Claude Code to consume
/// - `stderr`: message shown to the user
/// - `exit_code`: 0 allows, 2 blocks the pending tool call (PreToolUse only)
#[derive(Debug, Default, Clone)]
pub struct HookResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: i32,
}

impl HookResult {
    /// Normal output on stdout, exit 0.
    pub fn output(stdout: String) -> Self {
        Self {
            stdout: Some(stdout),
            stderr: None,
            exit_code: 0,
        }
    }

    /// Informational stderr message, exit 0.
    pub fn banner(msg: String) -> Self {
        Self {
            stdout: None,
            stderr: Some(msg),
            exit_code: 0,
        }
    }

    /// Blocking decision on stdout, exit 2.
    pub fn block(stdout: String) -> Self {
        Self {
            stdout: Some(stdout),
            stderr: None,
            exit_code: 2,
        }
    }

    /// No output, exit 0.
    pub fn empty() -> Self {
        Self::default()
    }
}

const BANNER: &str = "\u{1b}[36m\u{1f6e1}\u{fe0f}  vigil protection active\u{1b}[0m";

/// Main hook entrypoint: parse stdin, dispatch by `hook_event_name`.
///
/// The optional scanner is the external detection engine; with `None`,
/// events are captured with every verdict `allowed`.
pub fn hook_entrypoint_from_stdin(
    stdin: &str,
    scanner: Option<&mut dyn Scanner>,
) -> anyhow::Result<HookResult> {
    if stdin.trim().is_empty() {
        return Ok(HookResult::empty());
    }
    let raw = parse_hook_stdin(stdin)?;

    let hook_event_name = get_str(&raw, "hook_event_name");
    let cwd = get_str(&raw, "cwd");
    let project_dir = resolve_project_dir(&cwd);
    let config = VigilConfig::load(&project_dir);

    match hook_event_name.as_str() {
        "SessionStart" => dispatch_session_start(&project_dir),
        "UserPromptSubmit" => dispatch_user_prompt(&raw, &project_dir),
        "PreToolUse" => dispatch_pre_tool_use(&raw, &project_dir, &config),
        "PostToolUse" => dispatch_post_tool_use(&raw, &project_dir, &config, scanner),
        "SessionEnd" => dispatch_session_end(&raw, &project_dir, &config),
        _ => Ok(HookResult::empty()),
    }
}

/// SessionStart: resume an existing active session or create a new one.
fn dispatch_session_start(project_dir: &Path) -> anyhow::Result<HookResult> {
    if let Some(active) = vigil_session::get_active_session(project_dir) {
        debug!("resuming existing session: {active}");
        return Ok(HookResult::banner(BANNER.to_string()));
    }

    let session_id = vigil_session::generate_session_id();
    if vigil_session::init_session_file(&session_id, project_dir).is_some() {
        Ok(HookResult::banner(BANNER.to_string()))
    } else {
        warn!("failed to initialize session file");
        Ok(HookResult::empty())
    }
}

/// UserPromptSubmit: append a prompt record to the active session.
fn dispatch_user_prompt(raw: &Value, project_dir: &Path) -> anyhow::Result<HookResult> {
    let prompt = get_str(raw, "prompt");
    if prompt.is_empty() {
        return Ok(HookResult::empty());
    }
    let Some(session_id) = vigil_session::get_active_session(project_dir) else {
        return Ok(HookResult::empty());
    };

    let record = Record::UserPrompt(PromptRecord {
        id: vigil_session::next_event_id(&session_id, project_dir),
        timestamp: now_rfc3339(),
        prompt_length: prompt.chars().count() as u64,
        prompt,
    });
    vigil_session::append_record(&session_id, project_dir, &record);
    Ok(HookResult::empty())
}

/// PreToolUse: fast pattern check that blocks dangerous operations before
/// they run. Exit 2 blocks; everything else allows.
fn dispatch_pre_tool_use(
    raw: &Value,
    project_dir: &Path,
    config: &VigilConfig,
) -> anyhow::Result<HookResult> {
    let tool_name = get_str(raw, "tool_name");
    let empty = json!({});
    let tool_input = raw.get("tool_input").unwrap_or(&empty);
    let input_str = |key: &str| tool_input.get(key).and_then(Value::as_str);

    let block_reason = match tool_name.as_str() {
        "Bash" => input_str("command").and_then(guard::check_dangerous_command),
        "Write" => input_str("content").and_then(guard::check_dangerous_content),
        "Edit" => input_str("new_string").and_then(guard::check_dangerous_content),
        _ => None,
    };

    let session_id = vigil_session::get_active_session(project_dir).unwrap_or_default();

    if let Some(reason) = block_reason {
        let reason = format!("[vigil] Blocked: {reason}");
        let mut payload = raw.clone();
        payload["execution"] = json!({"verdict": "block", "reason": reason});
        sinks::log_event(config, project_dir, &session_id, payload, "Tool blocked");

        let output = json!({"decision": "block", "reason": reason});
        return Ok(HookResult::block(serde_json::to_string(&output)?));
    }

    let mut payload = raw.clone();
    payload["execution"] = json!({"verdict": "allow", "reason": "[vigil] Allowed"});
    sinks::log_event(config, project_dir, &session_id, payload, "Tool allowed");
    Ok(HookResult::empty())
}

/// PostToolUse: scan the completed call, capture it to the session stream,
/// and surface a warning when detections survive filtering.
fn dispatch_post_tool_use(
    raw: &Value,
    project_dir: &Path,
    config: &VigilConfig,
    scanner: Option<&mut dyn Scanner>,
) -> anyhow::Result<HookResult> {
    let timestamp_start = OffsetDateTime::now_utc();

    let tool_name = get_str(raw, "tool_name");
    let tool_input = raw.get("tool_input").cloned().unwrap_or_else(|| json!({}));
    // Claude Code sends "tool_response"; older payloads used "tool_result"
    let tool_result = raw
        .get("tool_response")
        .or_else(|| raw.get("tool_result"))
        .cloned()
        .unwrap_or(Value::Null);

    let text = extract_text(&tool_name, &tool_result);
    let is_error = detect_error(&text, &tool_result);

    let outcome = match scanner {
        Some(scanner) if should_scan(&tool_name) => {
            let input_text = extract_input_text(&tool_input);
            run_scan(scanner, &input_text, &text, config)
        }
        _ => ScanOutcome::default(),
    };

    let timestamp_end = OffsetDateTime::now_utc();

    let event = capture_event(
        project_dir,
        config,
        &CaptureParams {
            tool_name: &tool_name,
            tool_input: &tool_input,
            output_text: &text,
            timestamp_start,
            timestamp_end,
            outcome: &outcome,
            is_error,
        },
    );

    let session_id = vigil_session::get_active_session(project_dir).unwrap_or_default();
    let mut payload = raw.clone();
    if let Some(event) = &event {
        if let Ok(value) = serde_json::to_value(event) {
            payload["event"] = value;
        }
    }
    sinks::log_event(config, project_dir, &session_id, payload, "Tool event captured");

    // In PostToolUse a "block" decision cannot undo the call; it delivers
    // the warning text to the agent.
    if !outcome.detections.is_empty() {
        let source = warning::get_source_info(&tool_name, &tool_input);
        let warning_text = warning::format_warning(&outcome.detections, &tool_name, &source);
        let output = json!({"decision": "block", "reason": warning_text});
        return Ok(HookResult::output(serde_json::to_string(&output)?));
    }

    Ok(HookResult::empty())
}

/// SessionEnd: build the session object, generate the report, finalize.
fn dispatch_session_end(
    raw: &Value,
    project_dir: &Path,
    config: &VigilConfig,
) -> anyhow::Result<HookResult> {
    let session_end_time = get_str(raw, "session_end_time");
    let Some(session_id) = vigil_session::get_active_session(project_dir) else {
        warn!("no active session found, cannot generate report");
        return Ok(HookResult::empty());
    };

    let mut session = vigil_aggregate::build_session_object(
        &session_id,
        project_dir,
        (!session_end_time.is_empty()).then_some(session_end_time.as_str()),
    );
    let activity = vigil_aggregate::estimate_activity_metrics(&session.events);
    debug!("estimated activity: {} tool calls", activity.tool_calls);

    session.summary.ai_summary = Some(vigil_report::generate_summary(
        &session,
        config.ai_summary_enabled,
    ));

    let html = vigil_report::generate_html_report(&session, &activity);
    let report_path = config
        .report_dir(project_dir)
        .join(format!("{session_id}.html"));
    if vigil_report::save_report(&html, &report_path) {
        debug!("report saved: {}", report_path.display());
    } else {
        warn!("failed to save report to {}", report_path.display());
    }

    vigil_session::finalize_session(&session_id, project_dir);
    Ok(HookResult::empty())
}
