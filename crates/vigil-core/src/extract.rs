use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Matches absolute, `./`, `../`, and `~/` path tokens in a shell command.
/// Flags and URLs are filtered out after matching.
static SHELL_PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:^|\s)(/[^\s"'<>|;&]+|\./[^\s"'<>|;&]+|\.\./[^\s"'<>|;&]+|~/[^\s"'<>|;&]+)"#,
    )
    .expect("shell path pattern is valid")
});

/// Input fields that can carry injection payloads and are worth scanning.
const SCANNABLE_FIELDS: [&str; 7] = [
    "command",
    "content",
    "prompt",
    "query",
    "new_string",
    "old_string",
    "pattern",
];

/// Result fields probed, in order, when no `content` or `error` is present.
const FALLBACK_FIELDS: [&str; 7] = [
    "output",
    "result",
    "text",
    "file_content",
    "stdout",
    "data",
    "stderr",
];

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn compact_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Normalize a heterogeneous tool result into one text blob.
///
/// Tools return plain strings, `{content}` objects (string or block list),
/// `{error}` objects, a handful of ad hoc named fields, or lists of any of
/// these. The fallback chain is ordered and explicit; the last resort is the
/// compact JSON of the whole value.
pub fn extract_text(tool_name: &str, tool_result: &Value) -> String {
    match tool_result {
        Value::Null => String::new(),
        Value::String(s) => {
            if s.starts_with("Error:") || s.starts_with("[ERROR]") {
                format!("[ERROR] {s}")
            } else {
                s.clone()
            }
        }
        Value::Object(map) => {
            if let Some(content) = map.get("content") {
                match content {
                    Value::String(s) => return s.clone(),
                    Value::Array(blocks) => {
                        let texts: Vec<String> = blocks
                            .iter()
                            .filter_map(|block| match block {
                                Value::Object(b) => b.get("text").map(value_to_string),
                                Value::String(s) => Some(s.clone()),
                                _ => None,
                            })
                            .collect();
                        return texts.join("\n");
                    }
                    _ => {}
                }
            }

            // Failed tool calls surface as an error field (e.g. HTTP 403s)
            if let Some(error) = map.get("error") {
                match error {
                    Value::String(s) => return format!("[ERROR] {s}"),
                    Value::Object(e) => {
                        let msg = e
                            .get("message")
                            .map(value_to_string)
                            .unwrap_or_else(|| compact_json(error));
                        return format!("[ERROR] {msg}");
                    }
                    _ => {}
                }
            }

            for field in FALLBACK_FIELDS {
                if let Some(value) = map.get(field) {
                    if value.is_null() {
                        continue;
                    }
                    return value_to_string(value);
                }
            }

            // Read tool sometimes nests content under a file object
            if let Some(Value::Object(file)) = map.get("file") {
                if let Some(content) = file.get("content") {
                    return value_to_string(content);
                }
            }

            compact_json(tool_result)
        }
        Value::Array(items) => {
            let texts: Vec<String> = items
                .iter()
                .map(|item| extract_text(tool_name, item))
                .filter(|t| !t.is_empty())
                .collect();
            texts.join("\n")
        }
        other => value_to_string(other),
    }
}

/// Whether a tool result represents an error, surfaced as `is_error`.
pub fn detect_error(extracted_text: &str, tool_result: &Value) -> bool {
    if extracted_text.starts_with("[ERROR]") {
        return true;
    }
    if tool_result
        .as_object()
        .is_some_and(|o| o.contains_key("error"))
    {
        return true;
    }
    tool_result
        .as_str()
        .is_some_and(|s| s.starts_with("Error:"))
}

/// Collect scannable text from a tool's input fields, newline-joined.
pub fn extract_input_text(tool_input: &Value) -> String {
    let Some(map) = tool_input.as_object() else {
        return String::new();
    };
    let mut parts: Vec<&str> = Vec::new();
    for field in SCANNABLE_FIELDS {
        if let Some(Value::String(s)) = map.get(field) {
            if !s.is_empty() {
                parts.push(s);
            }
        }
    }
    parts.join("\n")
}

/// Extract file paths a tool touches, deduplicated in first-seen order.
///
/// File-oriented tools carry the path directly; shell commands get a
/// pattern scan of the command string.
pub fn extract_files_accessed(tool_name: &str, tool_input: &Value) -> Vec<String> {
    let Some(map) = tool_input.as_object() else {
        return Vec::new();
    };

    let mut paths: Vec<String> = Vec::new();
    match tool_name {
        "Read" | "Edit" | "Write" => {
            if let Some(Value::String(p)) = map.get("file_path") {
                paths.push(p.clone());
            }
        }
        "Glob" | "Grep" => {
            if let Some(Value::String(p)) = map.get("path") {
                paths.push(p.clone());
            }
        }
        "NotebookEdit" => {
            if let Some(Value::String(p)) = map.get("notebook_path") {
                paths.push(p.clone());
            }
        }
        "Bash" => {
            if let Some(Value::String(command)) = map.get("command") {
                paths.extend(paths_from_command(command));
            }
        }
        _ => {}
    }

    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

/// Pull path-looking tokens out of a shell command string.
pub fn paths_from_command(command: &str) -> Vec<String> {
    if command.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for caps in SHELL_PATH_PATTERN.captures_iter(command) {
        let token = caps[1].trim();
        if token.is_empty() || token.starts_with('-') || token.contains("://") {
            continue;
        }
        // Shed trailing punctuation the pattern may have swallowed
        let token = token.trim_end_matches(['.', ',', ';', ':', ')']);
        if !token.is_empty() {
            out.push(token.to_string());
        }
    }
    out
}
