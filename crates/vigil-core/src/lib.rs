pub mod classify;
pub mod config;
pub mod extract;
pub mod record;
pub mod truncate;
pub mod verdict;

pub use record::*;

/// Root marker directory created inside each instrumented project.
pub const VIGIL_DIR_NAME: &str = ".vigil";
/// Per-session record streams plus the active marker live here.
pub const SESSIONS_DIR_NAME: &str = "sessions";
/// Default destination for generated reports.
pub const REPORTS_DIR_NAME: &str = "reports";
/// Default destination for the file log sink.
pub const LOGS_DIR_NAME: &str = "logs";
/// Record stream file extension.
pub const SESSION_FILE_EXT: &str = ".jsonl";
/// Marker file holding the active session's ID.
pub const ACTIVE_SESSION_MARKER: &str = ".active";
/// Config file name, looked up under `.vigil/` or the user config dir.
pub const CONFIG_FILE_NAME: &str = "config.yaml";
