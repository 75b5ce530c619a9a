use crate::paths::SessionPaths;
use rand::Rng;
use serde_json::Value;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vigil_core::{InitRecord, Record};

/// Internal error type for store plumbing. Never escapes the public API:
/// every public operation is fail-open and maps errors to safe defaults.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session file not found: {0}")]
    MissingStream(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Current UTC time as RFC 3339 with `Z` suffix.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("RFC3339 formatting should not fail")
}

/// Generate a fresh session ID: `YYYY-MM-DD_HH-MM-SS_<6 hex>`.
///
/// Underscores keep the timestamp filesystem-safe; the random suffix keeps
/// IDs unique even for sub-second session creation. Never fails.
pub fn generate_session_id() -> String {
    let now = time::OffsetDateTime::now_utc();
    let timestamp = format!(
        "{:04}-{:02}-{:02}_{:02}-{:02}-{:02}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );
    let mut suffix = [0u8; 3];
    rand::thread_rng().fill(&mut suffix[..]);
    format!("{timestamp}_{}", hex::encode(suffix))
}

/// Create the backing stream for a session, write the init record as its
/// first line, and mark the session active for the project.
///
/// Returns the stream path, or `None` (with a warning) when the filesystem
/// is unwritable.
pub fn init_session_file(session_id: &str, project_dir: &Path) -> Option<PathBuf> {
    match try_init(session_id, project_dir) {
        Ok(path) => {
            debug!("session initialized: {session_id}");
            Some(path)
        }
        Err(e) => {
            warn!("failed to initialize session file: {e}");
            None
        }
    }
}

fn try_init(session_id: &str, project_dir: &Path) -> Result<PathBuf, StoreError> {
    let paths = SessionPaths::discover(project_dir);
    paths.ensure_layout()?;
    let session_file = paths.session_file(session_id);

    let resolved = project_dir
        .canonicalize()
        .unwrap_or_else(|_| project_dir.to_path_buf());
    let init = Record::Init(InitRecord {
        session_id: session_id.to_string(),
        timestamp: now_rfc3339(),
        platform: std::env::consts::OS.to_string(),
        project_dir: resolved.to_string_lossy().to_string(),
    });

    let line = serde_json::to_string(&init)?;
    std::fs::write(&session_file, format!("{line}\n"))?;
    std::fs::write(&paths.marker_file, session_id)?;
    Ok(session_file)
}

/// Append one record as a single JSON line.
///
/// A record without a `type` field is tagged `"type":"event"`. Returns
/// `false` (never panics) when the stream does not exist or the record is
/// not serializable. This runs synchronously inside every tool-call hook,
/// so it stays a single open/write/close.
pub fn append_event(session_id: &str, project_dir: &Path, record: &Value) -> bool {
    match try_append(session_id, project_dir, record) {
        Ok(()) => true,
        Err(e) => {
            warn!("failed to append event: {e}");
            false
        }
    }
}

fn try_append(session_id: &str, project_dir: &Path, record: &Value) -> Result<(), StoreError> {
    let paths = SessionPaths::discover(project_dir);
    let session_file = paths.session_file(session_id);
    if !session_file.exists() {
        return Err(StoreError::MissingStream(session_file));
    }

    let line = match record.as_object() {
        Some(map) if !map.contains_key("type") => {
            let mut tagged = map.clone();
            tagged.insert("type".to_string(), Value::String("event".to_string()));
            serde_json::to_string(&Value::Object(tagged))?
        }
        _ => serde_json::to_string(record)?,
    };

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&session_file)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Append a typed record.
pub fn append_record(session_id: &str, project_dir: &Path, record: &Record) -> bool {
    match serde_json::to_value(record) {
        Ok(value) => append_event(session_id, project_dir, &value),
        Err(e) => {
            warn!("failed to serialize record: {e}");
            false
        }
    }
}

/// Read every record of a stream as loose JSON values.
///
/// Lines that fail to parse are skipped with a warning; a corrupted middle
/// line never hides the lines around it. Empty on any I/O failure.
pub fn read_session_events(session_id: &str, project_dir: &Path) -> Vec<Value> {
    match try_read(session_id, project_dir) {
        Ok(records) => records,
        Err(e) => {
            warn!("failed to read session events: {e}");
            Vec::new()
        }
    }
}

fn try_read(session_id: &str, project_dir: &Path) -> Result<Vec<Value>, StoreError> {
    let paths = SessionPaths::discover(project_dir);
    let session_file = paths.session_file(session_id);
    if !session_file.exists() {
        debug!("session file not found: {}", session_file.display());
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(&session_file)?;
    let reader = std::io::BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => records.push(value),
            Err(e) => {
                warn!("failed to parse line: {e}");
                continue;
            }
        }
    }
    Ok(records)
}

/// Typed view of a stream. Lines that don't match a known record shape are
/// skipped with a warning.
pub fn read_session_records(session_id: &str, project_dir: &Path) -> Vec<Record> {
    read_session_events(session_id, project_dir)
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Record>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("skipping unrecognized record: {e}");
                None
            }
        })
        .collect()
}

/// Currently active session for a project, if any.
///
/// A marker pointing at a stream that no longer exists is stale: it is
/// deleted and `None` returned (self-healing).
pub fn get_active_session(project_dir: &Path) -> Option<String> {
    match try_active(project_dir) {
        Ok(session) => session,
        Err(e) => {
            warn!("failed to get active session: {e}");
            None
        }
    }
}

fn try_active(project_dir: &Path) -> Result<Option<String>, StoreError> {
    let paths = SessionPaths::discover(project_dir);
    if !paths.marker_file.exists() {
        return Ok(None);
    }
    let session_id = std::fs::read_to_string(&paths.marker_file)?
        .trim()
        .to_string();
    if paths.session_file(&session_id).exists() {
        Ok(Some(session_id))
    } else {
        let _ = std::fs::remove_file(&paths.marker_file);
        Ok(None)
    }
}

/// Finalize a session: remove the active marker (only when it still points
/// at `session_id`, so a newer session's marker is never clobbered). The
/// stream file stays intact for report generation.
pub fn finalize_session(session_id: &str, project_dir: &Path) -> Option<PathBuf> {
    match try_finalize(session_id, project_dir) {
        Ok(path) => path,
        Err(e) => {
            warn!("failed to finalize session: {e}");
            None
        }
    }
}

fn try_finalize(session_id: &str, project_dir: &Path) -> Result<Option<PathBuf>, StoreError> {
    let paths = SessionPaths::discover(project_dir);

    if paths.marker_file.exists() {
        let current = std::fs::read_to_string(&paths.marker_file)?
            .trim()
            .to_string();
        if current == session_id {
            std::fs::remove_file(&paths.marker_file)?;
        }
    }

    let session_file = paths.session_file(session_id);
    if session_file.exists() {
        debug!("session finalized: {session_id}");
        Ok(Some(session_file))
    } else {
        warn!("session file not found during finalization: {session_id}");
        Ok(None)
    }
}

/// Next sequential record ID for a stream: `max(id) + 1` over event and
/// user_prompt records, scanning the entire stream. `1` on any failure or
/// an empty stream.
///
/// The full rescan keeps IDs unique across writer restarts. There is a
/// read-max/append race window under truly concurrent writers; events come
/// from a single agent's sequential tool-call loop, so this is accepted.
pub fn next_event_id(session_id: &str, project_dir: &Path) -> u64 {
    let events = read_session_events(session_id, project_dir);
    if events.is_empty() {
        return 1;
    }
    events
        .iter()
        .filter(|e| {
            matches!(
                e.get("type").and_then(Value::as_str),
                Some("event" | "user_prompt")
            )
        })
        .filter_map(|e| e.get("id").and_then(Value::as_u64))
        .max()
        .map_or(1, |max| max + 1)
}
