use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};
use vigil_aggregate::SessionObject;
use vigil_core::Record;

const SUMMARY_MODEL: &str = "claude-3-5-haiku-20241022";
const MAX_SUMMARY_TOKENS: u32 = 256;
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const TIMEOUT: Duration = Duration::from_secs(15);

const SUMMARIZER_SYSTEM: &str = "You are a technical summarizer. Generate concise, factual \
summaries of development sessions. Never apologize or ask for clarification - always provide \
a summary based on available data.";

/// Compact human duration: `2h 5m`, `3m 12s`, `45s`.
pub fn format_duration(seconds: u64) -> String {
    if seconds >= 3600 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else if seconds >= 60 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

/// Deterministic stats-only summary, used whenever the AI path is disabled
/// or fails.
pub fn stats_summary(session: &SessionObject) -> String {
    let stats = &session.summary.stats;
    let mut parts = vec![format!(
        "Session completed {} tool calls over {}.",
        stats.total_events,
        format_duration(stats.duration_seconds)
    )];

    if stats.files_touched > 0 {
        parts.push(format!("Modified {} files.", stats.files_touched));
    }

    if stats.warnings > 0 || stats.blocked > 0 {
        let mut security = Vec::new();
        if stats.warnings > 0 {
            security.push(format!("{} warnings", stats.warnings));
        }
        if stats.blocked > 0 {
            security.push(format!("{} blocked", stats.blocked));
        }
        parts.push(format!("{}.", security.join(", ")));
    }

    parts.join(" ")
}

fn long_duration(seconds: u64) -> String {
    if seconds >= 3600 {
        format!("{} hours {} minutes", seconds / 3600, (seconds % 3600) / 60)
    } else if seconds >= 60 {
        format!("{} minutes {} seconds", seconds / 60, seconds % 60)
    } else {
        format!("{seconds} seconds")
    }
}

fn build_summary_prompt(session: &SessionObject) -> String {
    let stats = &session.summary.stats;

    let mut tools: Vec<(&String, &u64)> = stats.tools_used.iter().collect();
    tools.sort_by(|a, b| b.1.cmp(a.1));
    let tools_summary = tools
        .iter()
        .take(5)
        .map(|(tool, count)| format!("{tool}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");

    let events: Vec<_> = session
        .events
        .iter()
        .filter_map(|r| match r {
            Record::Event(e) => Some(e),
            _ => None,
        })
        .collect();

    let mut event_lines = Vec::new();
    let mut filenames: BTreeSet<String> = BTreeSet::new();
    for event in events.iter().take(10) {
        let verdict = event.verdict.as_str();
        let file_path = event
            .tool_input
            .get("file_path")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if !file_path.is_empty() {
            let filename = file_path.rsplit('/').next().unwrap_or(file_path);
            filenames.insert(filename.to_string());
            event_lines.push(format!("- {}: {filename} ({verdict})", event.tool_name));
        } else if event.tool_name == "Bash" {
            let cmd: String = event
                .tool_input
                .get("command")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .chars()
                .take(50)
                .collect();
            event_lines.push(format!("- Bash: {cmd}... ({verdict})"));
        } else {
            event_lines.push(format!("- {} ({verdict})", event.tool_name));
        }
    }
    if events.len() > 10 {
        event_lines.push(format!("- ... and {} more events", events.len() - 10));
    }

    let events_text = if event_lines.is_empty() {
        "No events recorded.".to_string()
    } else {
        event_lines.join("\n")
    };
    let files_list = if filenames.is_empty() {
        "None".to_string()
    } else {
        filenames.into_iter().collect::<Vec<_>>().join(", ")
    };
    let tools_text = if tools_summary.is_empty() {
        "None".to_string()
    } else {
        tools_summary
    };

    format!(
        "You are summarizing a Claude Code development session. Generate a 2-3 sentence summary.\n\n\
SESSION DATA:\n\
- Project: {}\n\
- Duration: {}\n\
- Tool calls: {}\n\
- Files modified: {}\n\
- Files accessed: {files_list}\n\
- Tools: {tools_text}\n\
- Security: {} warnings, {} blocked\n\n\
EVENTS:\n{events_text}\n\n\
TASK: Write exactly 2-3 sentences describing what was done. Be specific about files \
created/modified. Do not apologize or ask for more information - just summarize based on \
the data above.",
        session.project_dir,
        long_duration(stats.duration_seconds),
        stats.total_events,
        stats.files_touched,
        stats.warnings,
        stats.blocked,
    )
}

/// Generate the session summary.
///
/// With AI enabled and `ANTHROPIC_API_KEY` present, makes one Messages API
/// call and falls back to the stats summary on any failure or empty
/// response. Never errors.
pub fn generate_summary(session: &SessionObject, ai_enabled: bool) -> String {
    if !ai_enabled {
        debug!("AI summaries disabled in config, using stats-only summary");
        return stats_summary(session);
    }
    let api_key = match std::env::var("ANTHROPIC_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => {
            debug!("ANTHROPIC_API_KEY not set, using stats-only summary");
            return stats_summary(session);
        }
    };

    match request_summary(session, &api_key) {
        Ok(Some(text)) => text,
        Ok(None) => {
            warn!("empty response from summary API, using stats-only summary");
            stats_summary(session)
        }
        Err(e) => {
            warn!("summary API call failed: {e}, using stats-only summary");
            stats_summary(session)
        }
    }
}

fn request_summary(session: &SessionObject, api_key: &str) -> anyhow::Result<Option<String>> {
    let body = serde_json::json!({
        "model": SUMMARY_MODEL,
        "max_tokens": MAX_SUMMARY_TOKENS,
        "system": SUMMARIZER_SYSTEM,
        "messages": [{"role": "user", "content": build_summary_prompt(session)}],
    });

    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(TIMEOUT))
        .build()
        .new_agent();
    let mut response = agent
        .post(MESSAGES_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .header("Content-Type", "application/json")
        .send(body.to_string())?;

    let raw = response.body_mut().read_to_string()?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let text = parsed["content"][0]["text"]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(text)
}
