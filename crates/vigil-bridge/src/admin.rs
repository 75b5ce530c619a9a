use std::fs;
use std::path::{Path, PathBuf};

use crate::parse::now_rfc3339;

const VIGIL_HOOK_COMMAND: &str = "vigil hook";

/// Hook event names vigil manages.
const HOOK_EVENTS: &[&str] = &[
    "SessionStart",
    "UserPromptSubmit",
    "PreToolUse",
    "PostToolUse",
    "SessionEnd",
];

/// Check if a matcher group (Claude Code hook format) contains a vigil hook.
fn matcher_group_contains_vigil(group: &serde_json::Value) -> bool {
    if let Some(hooks_arr) = group.get("hooks").and_then(|h| h.as_array()) {
        for hook in hooks_arr {
            if let Some(cmd) = hook.get("command").and_then(|c| c.as_str()) {
                if cmd.contains("vigil hook") {
                    return true;
                }
            }
        }
    }
    // Legacy format: plain string command
    if let Some(s) = group.as_str() {
        return s.contains("vigil hook");
    }
    false
}

fn settings_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".claude").join("settings.local.json")
}

/// Install vigil hooks into `.claude/settings.local.json`, preserving any
/// existing non-vigil matcher groups. The previous file is backed up.
pub fn install(project_dir: &Path) -> anyhow::Result<()> {
    let path = settings_path(project_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut settings: serde_json::Value = if path.exists() {
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };

    if path.exists() {
        let ts = now_rfc3339().replace(':', "-");
        let backup = path.with_extension(format!("json.vigil.bak.{ts}"));
        fs::copy(&path, &backup)?;
    }

    let hooks = settings
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("settings is not an object"))?
        .entry("hooks")
        .or_insert_with(|| serde_json::json!({}));
    let hooks_obj = hooks
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("hooks is not an object"))?;

    for event_name in HOOK_EVENTS {
        let vigil_group = serde_json::json!({
            "matcher": "",
            "hooks": [
                {
                    "type": "command",
                    "command": VIGIL_HOOK_COMMAND
                }
            ]
        });

        let existing = hooks_obj
            .get(*event_name)
            .and_then(|v| v.as_array())
            .cloned();
        let mut groups: Vec<serde_json::Value> = existing
            .unwrap_or_default()
            .into_iter()
            .filter(|group| !matcher_group_contains_vigil(group))
            .collect();
        groups.push(vigil_group);
        hooks_obj.insert(event_name.to_string(), serde_json::Value::Array(groups));
    }

    fs::write(&path, serde_json::to_string_pretty(&settings)?)?;
    eprintln!("vigil hooks installed in {}", path.display());
    Ok(())
}

/// Remove vigil matcher groups from `.claude/settings.local.json`, leaving
/// everything else untouched.
pub fn uninstall(project_dir: &Path) -> anyhow::Result<()> {
    let path = settings_path(project_dir);
    if !path.exists() {
        eprintln!("no settings file at {}", path.display());
        return Ok(());
    }

    let content = fs::read_to_string(&path)?;
    let mut settings: serde_json::Value = serde_json::from_str(&content)?;

    if let Some(hooks_obj) = settings.get_mut("hooks").and_then(|h| h.as_object_mut()) {
        let mut empty_events = Vec::new();
        for (event_name, groups) in hooks_obj.iter_mut() {
            if let Some(arr) = groups.as_array_mut() {
                arr.retain(|group| !matcher_group_contains_vigil(group));
                if arr.is_empty() {
                    empty_events.push(event_name.clone());
                }
            }
        }
        for event_name in empty_events {
            hooks_obj.remove(&event_name);
        }
    }

    fs::write(&path, serde_json::to_string_pretty(&settings)?)?;
    eprintln!("vigil hooks removed from {}", path.display());
    Ok(())
}
