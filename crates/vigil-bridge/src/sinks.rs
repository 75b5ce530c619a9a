use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use vigil_core::config::{FileSinkConfig, HttpSinkConfig, LoggingConfig, VigilConfig};
use vigil_core::{LOGS_DIR_NAME, VIGIL_DIR_NAME};

use crate::parse::now_rfc3339;

/// A destination for structured log entries. Sinks must never fail loudly:
/// a broken sink drops entries, it does not break the hook.
pub trait LogSink {
    fn emit(&self, entry: &Value);
}

/// JSON-lines log file per session.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(config: &FileSinkConfig, project_dir: &Path, session_id: &str) -> Option<Self> {
        let log_dir = if config.output_dir.is_empty() {
            project_dir.join(VIGIL_DIR_NAME).join(LOGS_DIR_NAME)
        } else {
            let dir = PathBuf::from(&config.output_dir);
            if dir.is_absolute() {
                dir
            } else {
                project_dir.join(dir)
            }
        };
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            warn!("failed to create log directory {}: {e}", log_dir.display());
            return None;
        }
        Some(Self {
            path: log_dir.join(format!("{session_id}.log")),
        })
    }
}

impl LogSink for FileSink {
    fn emit(&self, entry: &Value) {
        let Ok(line) = serde_json::to_string(entry) else {
            return;
        };
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            let _ = writeln!(file, "{line}");
        }
    }
}

/// JSON POST of each entry to a log intake endpoint.
pub struct HttpSink {
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpSink {
    /// The API key comes from the env var named in config when set, falling
    /// back to the inline config value. No key is fine; some intakes
    /// authenticate by URL.
    pub fn new(config: &HttpSinkConfig) -> Option<Self> {
        if config.url.is_empty() {
            return None;
        }
        let from_env = if config.api_key_env.is_empty() {
            None
        } else {
            std::env::var(&config.api_key_env)
                .ok()
                .filter(|k| !k.is_empty())
        };
        let api_key = from_env.or_else(|| {
            if config.api_key.is_empty() {
                None
            } else {
                Some(config.api_key.clone())
            }
        });
        Some(Self {
            url: config.url.clone(),
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

impl LogSink for HttpSink {
    fn emit(&self, entry: &Value) {
        let Ok(body) = serde_json::to_string(entry) else {
            return;
        };
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .new_agent();
        let mut request = agent
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }
        // Delivery is best effort
        let _ = request.send(body);
    }
}

/// Compile-time sink registry: handler names map to constructors here, not
/// to plugins discovered at runtime. The set of sinks is closed and known.
pub fn build_sinks(
    config: &LoggingConfig,
    project_dir: &Path,
    session_id: &str,
) -> Vec<Box<dyn LogSink>> {
    let mut sinks: Vec<Box<dyn LogSink>> = Vec::new();
    for name in &config.handlers {
        match name.as_str() {
            "file" => {
                if let Some(sink) = FileSink::new(&config.file, project_dir, session_id) {
                    sinks.push(Box::new(sink));
                }
            }
            "http" => {
                if let Some(sink) = HttpSink::new(&config.http) {
                    sinks.push(Box::new(sink));
                }
            }
            other => warn!("unknown logging handler: '{other}' (skipped)"),
        }
    }
    sinks
}

/// Enrich a hook payload with ambient context and fan it out to every
/// configured sink.
pub fn log_event(
    config: &VigilConfig,
    project_dir: &Path,
    session_id: &str,
    mut payload: Value,
    message: &str,
) {
    if !config.logging.enabled || config.logging.handlers.is_empty() || session_id.is_empty() {
        return;
    }
    let Some(map) = payload.as_object_mut() else {
        return;
    };
    map.insert("timestamp".to_string(), Value::String(now_rfc3339()));
    map.insert("session_id".to_string(), Value::String(session_id.to_string()));
    map.insert("message".to_string(), Value::String(message.to_string()));
    map.insert(
        "host".to_string(),
        Value::String(std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())),
    );
    map.insert("service".to_string(), Value::String("vigil".to_string()));
    map.insert(
        "platform".to_string(),
        Value::String(std::env::consts::OS.to_string()),
    );
    map.insert(
        "project_dir".to_string(),
        Value::String(project_dir.to_string_lossy().to_string()),
    );
    map.insert(
        "user".to_string(),
        Value::String(std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())),
    );

    for sink in build_sinks(&config.logging, project_dir, session_id) {
        sink.emit(&payload);
    }
}
