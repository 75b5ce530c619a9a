use std::path::Path;
use vigil_core::SESSION_FILE_EXT;
use vigil_session::SessionPaths;

/// `vigil sessions`: list captured record streams, newest first.
pub fn execute(project_dir: &Path) -> anyhow::Result<()> {
    let paths = SessionPaths::discover(project_dir);
    if !paths.sessions_dir.is_dir() {
        println!("no sessions captured");
        return Ok(());
    }

    let active = vigil_session::get_active_session(project_dir);

    let mut sessions: Vec<(std::time::SystemTime, String)> = Vec::new();
    for entry in std::fs::read_dir(&paths.sessions_dir)?.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(session_id) = name.strip_suffix(SESSION_FILE_EXT) else {
            continue;
        };
        let mtime = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::UNIX_EPOCH);
        sessions.push((mtime, session_id.to_string()));
    }

    if sessions.is_empty() {
        println!("no sessions captured");
        return Ok(());
    }

    sessions.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, session_id) in sessions {
        let records = vigil_session::read_session_records(&session_id, project_dir);
        let stats = vigil_aggregate::session_statistics(&records);
        let marker = if active.as_deref() == Some(session_id.as_str()) {
            " (active)"
        } else {
            ""
        };
        println!(
            "{session_id}{marker}  {} events, {} prompts",
            stats.total_events, stats.user_prompts
        );
    }

    Ok(())
}
