use std::path::Path;
use tracing::warn;
use vigil_aggregate::{ActivityMetrics, SessionObject};
use vigil_core::{Record, Verdict};

use crate::summary::format_duration;

const STYLE: &str = r#"
:root { --bg: #0f1117; --panel: #181b23; --text: #d8dce5; --dim: #8a90a0;
        --ok: #3fb950; --warn: #d29922; --bad: #f85149; --accent: #58a6ff; }
* { box-sizing: border-box; margin: 0; }
body { background: var(--bg); color: var(--text);
       font: 14px/1.5 -apple-system, "Segoe UI", Roboto, sans-serif; padding: 2rem; }
h1 { font-size: 1.3rem; margin-bottom: .25rem; }
h2 { font-size: 1.05rem; margin: 1.5rem 0 .5rem; color: var(--accent); }
.meta { color: var(--dim); font-size: .85rem; margin-bottom: 1rem; }
.tiles { display: flex; flex-wrap: wrap; gap: .75rem; }
.tile { background: var(--panel); border-radius: 8px; padding: .75rem 1.25rem; min-width: 7rem; }
.tile .value { font-size: 1.4rem; font-weight: 600; }
.tile .label { color: var(--dim); font-size: .75rem; text-transform: uppercase; }
.badge { border-radius: 4px; padding: .05rem .45rem; font-size: .75rem; font-weight: 600; }
.badge.allowed { background: #1c3524; color: var(--ok); }
.badge.warned { background: #3a2d12; color: var(--warn); }
.badge.blocked { background: #3d1a1d; color: var(--bad); }
.badge.scan_failed { background: #2a2d36; color: var(--dim); }
.trace { border-left: 2px solid #2a2d36; margin-top: .5rem; }
.entry { padding: .4rem .9rem; display: flex; gap: .75rem; align-items: baseline; }
.entry .time { color: var(--dim); font-size: .75rem; min-width: 4.5rem; }
.entry .who { font-weight: 600; min-width: 4rem; font-size: .8rem; }
.entry.prompt .who { color: var(--accent); }
.entry .body { flex: 1; white-space: pre-wrap; word-break: break-word; }
.entry .files { color: var(--dim); font-size: .8rem; }
.error-flag { color: var(--bad); font-size: .75rem; font-weight: 600; }
.estimate-note { color: var(--dim); font-size: .75rem; font-style: italic; }
table { border-collapse: collapse; margin-top: .25rem; }
td, th { padding: .2rem .9rem .2rem 0; text-align: left; color: var(--text); }
th { color: var(--dim); font-weight: 500; }
footer { margin-top: 2rem; color: var(--dim); font-size: .75rem; }
"#;

/// Escape text for safe placement inside HTML content.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Serialize data for embedding inside a `<script>` tag without letting it
/// break out of script context.
fn json_for_html(data: &impl serde::Serialize) -> String {
    let json = serde_json::to_string(data).unwrap_or_else(|_| "null".to_string());
    json.replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

/// Best-effort display form of an RFC 3339 timestamp.
fn format_timestamp(timestamp: &str) -> String {
    if timestamp.is_empty() {
        return "N/A".to_string();
    }
    let rfc3339 = &time::format_description::well_known::Rfc3339;
    match time::OffsetDateTime::parse(timestamp, rfc3339) {
        Ok(dt) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
            dt.year(),
            dt.month() as u8,
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        Err(_) => timestamp.chars().take(19).collect(),
    }
}

/// Clock-only portion for trace rows.
fn format_clock(timestamp: &str) -> String {
    let rfc3339 = &time::format_description::well_known::Rfc3339;
    match time::OffsetDateTime::parse(timestamp, rfc3339) {
        Ok(dt) => format!("{:02}:{:02}:{:02}", dt.hour(), dt.minute(), dt.second()),
        Err(_) => timestamp.chars().skip(11).take(8).collect(),
    }
}

fn stat_tile(value: &str, label: &str) -> String {
    format!(
        r#"<div class="tile"><div class="value">{}</div><div class="label">{}</div></div>"#,
        escape_html(value),
        escape_html(label)
    )
}

fn verdict_badge(verdict: Verdict) -> String {
    let name = verdict.as_str();
    format!(r#"<span class="badge {name}">{name}</span>"#)
}

const MAX_PROMPT_DISPLAY: usize = 500;
const MAX_OUTPUT_DISPLAY: usize = 400;

fn trace_section(session: &SessionObject) -> String {
    if session.events.is_empty() {
        return String::new();
    }

    // Merge prompts and tool calls chronologically
    let mut entries: Vec<(&str, &Record)> = session
        .events
        .iter()
        .map(|r| match r {
            Record::Event(e) => (e.timestamp_start.as_str(), r),
            Record::UserPrompt(p) => (p.timestamp.as_str(), r),
            Record::Init(i) => (i.timestamp.as_str(), r),
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut rows = Vec::new();
    for (ts, record) in entries {
        match record {
            Record::UserPrompt(prompt) => {
                let truncated = prompt.prompt.chars().count() > MAX_PROMPT_DISPLAY;
                let shown: String = prompt.prompt.chars().take(MAX_PROMPT_DISPLAY).collect();
                let notice = if truncated {
                    format!(
                        r#"<div class="estimate-note">[Showing first {MAX_PROMPT_DISPLAY} of {} characters]</div>"#,
                        prompt.prompt_length
                    )
                } else {
                    String::new()
                };
                rows.push(format!(
                    r#"<div class="entry prompt"><span class="time">{}</span><span class="who">USER</span><div class="body">{}{notice}</div></div>"#,
                    format_clock(ts),
                    escape_html(&shown)
                ));
            }
            Record::Event(event) => {
                let error_flag = if event.is_error {
                    r#" <span class="error-flag">ERROR</span>"#
                } else {
                    ""
                };
                let files = if event.files_accessed.is_empty() {
                    String::new()
                } else {
                    format!(
                        r#"<div class="files">{}</div>"#,
                        escape_html(&event.files_accessed.join(", "))
                    )
                };
                let output: String = event.tool_output.chars().take(MAX_OUTPUT_DISPLAY).collect();
                rows.push(format!(
                    r#"<div class="entry"><span class="time">{}</span><span class="who">{}</span><div class="body">{} {}{error_flag}{files}<div>{}</div></div></div>"#,
                    format_clock(ts),
                    escape_html(&event.tool_name),
                    verdict_badge(event.verdict),
                    escape_html(&format!("{}ms", event.duration_ms)),
                    escape_html(&output)
                ));
            }
            Record::Init(_) => {}
        }
    }

    format!(
        "<h2>Conversation Trace</h2><div class=\"trace\">{}</div>",
        rows.join("\n")
    )
}

fn tools_section(session: &SessionObject) -> String {
    let tools = &session.summary.stats.tools_used;
    if tools.is_empty() {
        return String::new();
    }
    let mut sorted: Vec<(&String, &u64)> = tools.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let rows: String = sorted
        .iter()
        .map(|(tool, count)| {
            format!(
                "<tr><td>{}</td><td>{count}</td></tr>",
                escape_html(tool)
            )
        })
        .collect();
    format!(
        "<h2>Tools Used</h2><table><tr><th>Tool</th><th>Calls</th></tr>{rows}</table>"
    )
}

fn activity_section(activity: &ActivityMetrics) -> String {
    format!(
        r#"<h2>Activity</h2><div class="tiles">{}{}{}</div><p class="estimate-note">Token counts are estimates (~4 chars/token), not API-reported usage.</p>"#,
        stat_tile(&activity.estimated_input_tokens.to_string(), "Input tokens (est.)"),
        stat_tile(&activity.estimated_output_tokens.to_string(), "Output tokens (est.)"),
        stat_tile(
            &format_duration(activity.total_duration_ms / 1000),
            "Processing time"
        ),
    )
}

/// Render a complete, self-contained HTML report for one session.
pub fn generate_html_report(session: &SessionObject, activity: &ActivityMetrics) -> String {
    let stats = &session.summary.stats;

    let summary_text = session
        .summary
        .ai_summary
        .as_deref()
        .unwrap_or("No summary available.");

    let mut mcp_skill_tiles = String::new();
    if stats.mcp_calls > 0 {
        mcp_skill_tiles.push_str(&stat_tile(&stats.mcp_calls.to_string(), "MCP calls"));
    }
    if stats.skill_calls > 0 {
        mcp_skill_tiles.push_str(&stat_tile(&stats.skill_calls.to_string(), "Skill calls"));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>vigil session report - {session_id}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>vigil session report</h1>
<div class="meta">{session_id} &middot; {start} &rarr; {end} &middot; {platform} &middot; {project}</div>
<p>{summary}</p>
<h2>Session</h2>
<div class="tiles">{tiles}{mcp_skill_tiles}</div>
{tools}
{activity}
{trace}
<script>const SESSION_DATA = {data};</script>
<footer>generated by vigil</footer>
</body>
</html>
"#,
        session_id = escape_html(&session.session_id),
        start = escape_html(&format_timestamp(&session.session_start)),
        end = escape_html(&format_timestamp(&session.session_end)),
        platform = escape_html(&session.platform),
        project = escape_html(&session.project_dir),
        summary = escape_html(summary_text),
        tiles = [
            stat_tile(&stats.total_events.to_string(), "Tool calls"),
            stat_tile(&stats.user_prompts.to_string(), "Prompts"),
            stat_tile(&stats.files_touched.to_string(), "Files touched"),
            stat_tile(&stats.warnings.to_string(), "Warnings"),
            stat_tile(&stats.blocked.to_string(), "Blocked"),
            stat_tile(&format_duration(stats.duration_seconds), "Duration"),
        ]
        .join(""),
        tools = tools_section(session),
        activity = activity_section(activity),
        trace = trace_section(session),
        data = json_for_html(session),
    )
}

/// Write the report to disk, creating parent directories. Fail-open.
pub fn save_report(html: &str, path: &Path) -> bool {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("failed to create report directory {}: {e}", parent.display());
            return false;
        }
    }
    match std::fs::write(path, html) {
        Ok(()) => true,
        Err(e) => {
            warn!("failed to save report to {}: {e}", path.display());
            false
        }
    }
}
