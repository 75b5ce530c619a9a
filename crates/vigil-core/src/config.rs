use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::{CONFIG_FILE_NAME, REPORTS_DIR_NAME, VIGIL_DIR_NAME};

const DEFAULT_TRUNCATION_KB: u64 = 10;
const DEFAULT_MAX_CONTENT_LENGTH: usize = 50_000;

/// Runtime configuration. Every field has a working default; loading never
/// fails: any problem is logged and defaults win.
#[derive(Debug, Clone)]
pub struct VigilConfig {
    /// Custom report destination. Empty means `<project>/.vigil/reports/`;
    /// relative paths resolve against the project directory.
    pub report_output_dir: String,
    /// Use the AI summary when an API key is present.
    pub ai_summary_enabled: bool,
    /// Maximum stored tool output size, in KB.
    pub output_truncation_kb: u64,
    /// Minimum detection severity kept by the scan layer.
    pub min_severity: String,
    /// Cap on text handed to the scanner, in chars.
    pub max_content_length: usize,
    pub logging: LoggingConfig,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            report_output_dir: String::new(),
            ai_summary_enabled: true,
            output_truncation_kb: DEFAULT_TRUNCATION_KB,
            min_severity: "low".to_string(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            logging: LoggingConfig::default(),
        }
    }
}

/// Structured-log fan-out configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Sink names, matched against the compile-time registry ("file", "http").
    pub handlers: Vec<String>,
    pub file: FileSinkConfig,
    pub http: HttpSinkConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            handlers: Vec::new(),
            file: FileSinkConfig::default(),
            http: HttpSinkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    /// Empty means `<project>/.vigil/logs/`.
    pub output_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSinkConfig {
    pub url: String,
    /// Env var consulted for the API key before `api_key`.
    pub api_key_env: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key_env: String::new(),
            api_key: String::new(),
            timeout_secs: 5,
        }
    }
}

/// Loose deserialization target: known keys are optional, everything else
/// lands in `unknown` so it can be warned about and ignored.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    report_output_dir: Option<String>,
    ai_summary_enabled: Option<bool>,
    output_truncation_kb: Option<i64>,
    min_severity: Option<String>,
    max_content_length: Option<usize>,
    logging: Option<LoggingConfig>,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_yaml::Value>,
}

impl VigilConfig {
    /// Load the config for a project: `VIGIL_CONFIG` override, then
    /// `<project>/.vigil/config.yaml`, then the user config dir.
    pub fn load(project_dir: &Path) -> Self {
        match Self::find_config_file(project_dir) {
            Some(path) => Self::load_from_path(&path),
            None => Self::default(),
        }
    }

    fn find_config_file(project_dir: &Path) -> Option<PathBuf> {
        if let Ok(p) = std::env::var("VIGIL_CONFIG") {
            let p = PathBuf::from(p);
            if p.exists() {
                return Some(p);
            }
        }
        let project_cfg = project_dir.join(VIGIL_DIR_NAME).join(CONFIG_FILE_NAME);
        if project_cfg.exists() {
            return Some(project_cfg);
        }
        if let Some(user_dir) = dirs::config_dir() {
            let user_cfg = user_dir.join("vigil").join(CONFIG_FILE_NAME);
            if user_cfg.exists() {
                return Some(user_cfg);
            }
        }
        None
    }

    pub fn load_from_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_yaml_str(&raw),
            Err(e) => {
                warn!("failed to read config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn from_yaml_str(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        let parsed: RawConfig = match serde_yaml::from_str(raw) {
            Ok(p) => p,
            Err(e) => {
                warn!("failed to parse config: {e}");
                return Self::default();
            }
        };

        for key in parsed.unknown.keys() {
            warn!("unknown configuration key: '{key}' (ignored)");
        }

        let output_truncation_kb = match parsed.output_truncation_kb {
            Some(kb) if kb >= 1 => kb as u64,
            Some(_) => {
                warn!("output_truncation_kb must be positive, using default ({DEFAULT_TRUNCATION_KB} KB)");
                DEFAULT_TRUNCATION_KB
            }
            None => DEFAULT_TRUNCATION_KB,
        };

        Self {
            report_output_dir: parsed.report_output_dir.unwrap_or_default(),
            ai_summary_enabled: parsed.ai_summary_enabled.unwrap_or(true),
            output_truncation_kb,
            min_severity: parsed.min_severity.unwrap_or_else(|| "low".to_string()),
            max_content_length: parsed
                .max_content_length
                .unwrap_or(DEFAULT_MAX_CONTENT_LENGTH),
            logging: parsed.logging.unwrap_or_default(),
        }
    }

    /// Resolve the report destination for a project.
    pub fn report_dir(&self, project_dir: &Path) -> PathBuf {
        if self.report_output_dir.is_empty() {
            project_dir.join(VIGIL_DIR_NAME).join(REPORTS_DIR_NAME)
        } else {
            let custom = PathBuf::from(&self.report_output_dir);
            if custom.is_absolute() {
                custom
            } else {
                project_dir.join(custom)
            }
        }
    }

    pub fn truncation_bytes(&self) -> usize {
        self.output_truncation_kb as usize * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = VigilConfig::default();
        assert!(cfg.ai_summary_enabled);
        assert_eq!(cfg.output_truncation_kb, 10);
        assert_eq!(cfg.truncation_bytes(), 10 * 1024);
        assert_eq!(cfg.min_severity, "low");
        assert!(cfg.logging.enabled);
        assert!(cfg.logging.handlers.is_empty());
    }

    #[test]
    fn yaml_overrides_apply() {
        let cfg = VigilConfig::from_yaml_str(
            "report_output_dir: audit/out\nai_summary_enabled: false\noutput_truncation_kb: 32\nmin_severity: medium\n",
        );
        assert_eq!(cfg.report_output_dir, "audit/out");
        assert!(!cfg.ai_summary_enabled);
        assert_eq!(cfg.output_truncation_kb, 32);
        assert_eq!(cfg.min_severity, "medium");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cfg = VigilConfig::from_yaml_str("bogus_key: 1\nai_summary_enabled: false\n");
        assert!(!cfg.ai_summary_enabled);
    }

    #[test]
    fn invalid_yaml_yields_defaults() {
        let cfg = VigilConfig::from_yaml_str(": not yaml : [");
        assert_eq!(cfg.output_truncation_kb, 10);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = VigilConfig::from_yaml_str("   \n");
        assert!(cfg.ai_summary_enabled);
    }

    #[test]
    fn nonpositive_truncation_resets_to_default() {
        let cfg = VigilConfig::from_yaml_str("output_truncation_kb: 0\n");
        assert_eq!(cfg.output_truncation_kb, 10);
        let cfg = VigilConfig::from_yaml_str("output_truncation_kb: -4\n");
        assert_eq!(cfg.output_truncation_kb, 10);
    }

    #[test]
    fn report_dir_default_and_custom() {
        let project = Path::new("/work/proj");
        let cfg = VigilConfig::default();
        assert_eq!(
            cfg.report_dir(project),
            PathBuf::from("/work/proj/.vigil/reports")
        );

        let mut cfg = VigilConfig::default();
        cfg.report_output_dir = "relative/reports".to_string();
        assert_eq!(
            cfg.report_dir(project),
            PathBuf::from("/work/proj/relative/reports")
        );

        cfg.report_output_dir = "/abs/reports".to_string();
        assert_eq!(cfg.report_dir(project), PathBuf::from("/abs/reports"));
    }

    #[test]
    fn logging_section_parses() {
        let cfg = VigilConfig::from_yaml_str(
            "logging:\n  enabled: true\n  handlers:\n    - file\n    - http\n  file:\n    output_dir: logs\n  http:\n    url: https://intake.example/logs\n    api_key_env: INTAKE_KEY\n",
        );
        assert_eq!(cfg.logging.handlers, vec!["file", "http"]);
        assert_eq!(cfg.logging.file.output_dir, "logs");
        assert_eq!(cfg.logging.http.url, "https://intake.example/logs");
        assert_eq!(cfg.logging.http.api_key_env, "INTAKE_KEY");
        assert_eq!(cfg.logging.http.timeout_secs, 5);
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let cfg = VigilConfig::load_from_path(Path::new("/nonexistent/vigil.yaml"));
        assert_eq!(cfg.output_truncation_kb, 10);
    }
}
