use std::path::{Path, PathBuf};
use vigil_core::{
    ACTIVE_SESSION_MARKER, LOGS_DIR_NAME, REPORTS_DIR_NAME, SESSIONS_DIR_NAME, SESSION_FILE_EXT,
    VIGIL_DIR_NAME,
};

/// All well-known paths under a project's `.vigil/` directory.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub project_dir: PathBuf,
    pub vigil_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub marker_file: PathBuf,
}

impl SessionPaths {
    /// Derive all paths from a project dir. Pure computation, no I/O.
    pub fn discover(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let vigil_dir = project_dir.join(VIGIL_DIR_NAME);
        let sessions_dir = vigil_dir.join(SESSIONS_DIR_NAME);
        Self {
            reports_dir: vigil_dir.join(REPORTS_DIR_NAME),
            logs_dir: vigil_dir.join(LOGS_DIR_NAME),
            marker_file: sessions_dir.join(ACTIVE_SESSION_MARKER),
            sessions_dir,
            vigil_dir,
            project_dir,
        }
    }

    /// Create the sessions and reports directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.sessions_dir, &self.reports_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Backing record-stream file for one session.
    pub fn session_file(&self, session_id: &str) -> PathBuf {
        self.sessions_dir
            .join(format!("{session_id}{SESSION_FILE_EXT}"))
    }

    /// Whether `.vigil/` exists for this project.
    pub fn is_initialized(&self) -> bool {
        self.vigil_dir.is_dir()
    }
}

/// Walk up from `start` looking for a directory containing `.vigil/`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    let mut cur = start.to_path_buf();
    loop {
        if cur.join(VIGIL_DIR_NAME).is_dir() {
            return Some(cur);
        }
        if !cur.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let p = SessionPaths::discover("/tmp/proj");
        assert_eq!(p.vigil_dir, PathBuf::from("/tmp/proj/.vigil"));
        assert_eq!(p.sessions_dir, PathBuf::from("/tmp/proj/.vigil/sessions"));
        assert_eq!(p.reports_dir, PathBuf::from("/tmp/proj/.vigil/reports"));
        assert_eq!(p.logs_dir, PathBuf::from("/tmp/proj/.vigil/logs"));
        assert_eq!(
            p.marker_file,
            PathBuf::from("/tmp/proj/.vigil/sessions/.active")
        );
        assert_eq!(
            p.session_file("2026-02-01_10-00-00_abc123"),
            PathBuf::from("/tmp/proj/.vigil/sessions/2026-02-01_10-00-00_abc123.jsonl")
        );
    }

    #[test]
    fn ensure_layout_creates_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let p = SessionPaths::discover(tmp.path());
        p.ensure_layout().unwrap();
        assert!(p.sessions_dir.is_dir());
        assert!(p.reports_dir.is_dir());
        assert!(p.is_initialized());
    }

    #[test]
    fn find_root_walks_up() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(tmp.path().join(VIGIL_DIR_NAME)).unwrap();
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_root(&nested), Some(tmp.path().to_path_buf()));
    }
}
