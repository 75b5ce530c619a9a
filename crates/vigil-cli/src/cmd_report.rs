use std::path::{Path, PathBuf};
use vigil_core::config::VigilConfig;
use vigil_core::SESSION_FILE_EXT;
use vigil_session::SessionPaths;

/// `vigil report`: regenerate the HTML report for a session on demand.
pub fn execute(
    project_dir: &Path,
    session: Option<&str>,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let session_id = match session {
        Some(id) => id.to_string(),
        None => default_session(project_dir)
            .ok_or_else(|| anyhow::anyhow!("no sessions found under .vigil/sessions/"))?,
    };

    let config = VigilConfig::load(project_dir);
    let mut session_obj = vigil_aggregate::build_session_object(&session_id, project_dir, None);
    if session_obj.events.is_empty() && session_obj.session_start.is_empty() {
        anyhow::bail!("session not found: {session_id}");
    }

    let activity = vigil_aggregate::estimate_activity_metrics(&session_obj.events);
    session_obj.summary.ai_summary = Some(vigil_report::generate_summary(
        &session_obj,
        config.ai_summary_enabled,
    ));

    let report_dir = match output {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if dir.is_absolute() {
                dir
            } else {
                project_dir.join(dir)
            }
        }
        None => config.report_dir(project_dir),
    };
    let report_path = report_dir.join(format!("{session_id}.html"));

    let html = vigil_report::generate_html_report(&session_obj, &activity);
    if !vigil_report::save_report(&html, &report_path) {
        anyhow::bail!("failed to write report to {}", report_path.display());
    }

    println!("{}", report_path.display());
    Ok(())
}

/// Active session if any, otherwise the most recently modified stream.
fn default_session(project_dir: &Path) -> Option<String> {
    if let Some(active) = vigil_session::get_active_session(project_dir) {
        return Some(active);
    }

    let paths = SessionPaths::discover(project_dir);
    let mut best: Option<(std::time::SystemTime, String)> = None;
    for entry in std::fs::read_dir(&paths.sessions_dir).ok()?.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(session_id) = name.strip_suffix(SESSION_FILE_EXT) else {
            continue;
        };
        let Ok(mtime) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if best.as_ref().is_none_or(|(t, _)| mtime > *t) {
            best = Some((mtime, session_id.to_string()));
        }
    }
    best.map(|(_, id)| id)
}
