use tracing::warn;
use vigil_core::config::VigilConfig;
use vigil_core::verdict::{assign_verdict, dedup_by_rule, filter_by_severity, matched_rules};
use vigil_core::{Detection, Severity, Verdict};

/// Boundary to the external detection engine. The engine itself (keyword,
/// semantic, or LLM based) is not part of this crate; anything that can turn
/// text into detections plugs in here.
pub trait Scanner {
    fn scan(&mut self, text: &str) -> anyhow::Result<Vec<Detection>>;
}

/// Tools whose output is worth scanning for injected instructions. MCP tools
/// are monitored as well, matched by name prefix.
pub const MONITORED_TOOLS: [&str; 6] = ["Read", "WebFetch", "Bash", "Grep", "Glob", "Task"];

pub fn should_scan(tool_name: &str) -> bool {
    MONITORED_TOOLS.contains(&tool_name)
        || tool_name.starts_with("mcp__")
        || tool_name.starts_with("mcp_")
}

/// Texts shorter than this are not worth a scan round-trip.
const MIN_SCAN_LENGTH: usize = 10;

/// Result of scanning one tool call: the assigned verdict plus the
/// surviving (filtered, deduplicated) detections.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub verdict: Verdict,
    pub severity: Option<Severity>,
    pub rules_matched: Vec<String>,
    pub scan_time_ms: u64,
    pub detections: Vec<Detection>,
}

impl ScanOutcome {
    fn scan_failed(scan_time_ms: u64) -> Self {
        Self {
            verdict: Verdict::ScanFailed,
            severity: None,
            rules_matched: Vec::new(),
            scan_time_ms,
            detections: Vec::new(),
        }
    }
}

/// Scan a tool call's input and output text and fold the detections into a
/// verdict.
///
/// Each text is scanned only when it carries at least `MIN_SCAN_LENGTH`
/// chars, capped at the configured content length. A scanner error maps to
/// the `scan_failed` verdict: recorded, never raised, and never confused
/// with `allowed`.
pub fn run_scan(
    scanner: &mut dyn Scanner,
    input_text: &str,
    output_text: &str,
    config: &VigilConfig,
) -> ScanOutcome {
    let started = std::time::Instant::now();
    let mut detections = Vec::new();

    for text in [input_text, output_text] {
        if text.chars().count() < MIN_SCAN_LENGTH {
            continue;
        }
        let capped: String = text.chars().take(config.max_content_length).collect();
        match scanner.scan(&capped) {
            Ok(found) => detections.extend(found),
            Err(e) => {
                warn!("scan failed: {e}");
                return ScanOutcome::scan_failed(started.elapsed().as_millis() as u64);
            }
        }
    }

    let detections = dedup_by_rule(filter_by_severity(detections, &config.min_severity));
    let (verdict, severity) = assign_verdict(&detections);
    ScanOutcome {
        verdict,
        severity,
        rules_matched: matched_rules(&detections),
        scan_time_ms: started.elapsed().as_millis() as u64,
        detections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KeywordScanner;

    impl Scanner for KeywordScanner {
        fn scan(&mut self, text: &str) -> anyhow::Result<Vec<Detection>> {
            let mut found = Vec::new();
            for (needle, rule, severity) in [
                ("EVIL_HIGH", "rule_high", "high"),
                ("EVIL_MED", "rule_med", "medium"),
                ("EVIL_LOW", "rule_low", "low"),
            ] {
                if text.contains(needle) {
                    found.push(Detection {
                        rule_name: Some(rule.to_string()),
                        severity: Some(severity.to_string()),
                        ..Default::default()
                    });
                }
            }
            Ok(found)
        }
    }

    struct FailingScanner;

    impl Scanner for FailingScanner {
        fn scan(&mut self, _text: &str) -> anyhow::Result<Vec<Detection>> {
            anyhow::bail!("engine exploded")
        }
    }

    #[test]
    fn monitored_tools_and_mcp_prefixes() {
        assert!(should_scan("Read"));
        assert!(should_scan("WebFetch"));
        assert!(should_scan("mcp__github__list_prs"));
        assert!(should_scan("mcp_ide_getDiagnostics"));
        assert!(!should_scan("Edit"));
        assert!(!should_scan("Skill"));
    }

    #[test]
    fn clean_text_is_allowed() {
        let outcome = run_scan(
            &mut KeywordScanner,
            "",
            "perfectly ordinary output text",
            &VigilConfig::default(),
        );
        assert_eq!(outcome.verdict, Verdict::Allowed);
        assert!(outcome.severity.is_none());
        assert!(outcome.detections.is_empty());
    }

    #[test]
    fn high_detection_blocks() {
        let outcome = run_scan(
            &mut KeywordScanner,
            "",
            "something EVIL_HIGH lurks here",
            &VigilConfig::default(),
        );
        assert_eq!(outcome.verdict, Verdict::Blocked);
        assert_eq!(outcome.severity, Some(Severity::High));
        assert_eq!(outcome.rules_matched, vec!["rule_high"]);
    }

    #[test]
    fn input_and_output_are_both_scanned() {
        let outcome = run_scan(
            &mut KeywordScanner,
            "EVIL_MED in the input text",
            "EVIL_LOW in the output text",
            &VigilConfig::default(),
        );
        assert_eq!(outcome.verdict, Verdict::Warned);
        assert_eq!(outcome.severity, Some(Severity::Medium));
        assert_eq!(outcome.rules_matched, vec!["rule_med", "rule_low"]);
    }

    #[test]
    fn duplicate_rules_across_texts_dedup() {
        let outcome = run_scan(
            &mut KeywordScanner,
            "EVIL_LOW appears in the input",
            "EVIL_LOW appears in the output",
            &VigilConfig::default(),
        );
        assert_eq!(outcome.rules_matched, vec!["rule_low"]);
        assert_eq!(outcome.detections.len(), 1);
    }

    #[test]
    fn short_texts_are_skipped() {
        let outcome = run_scan(&mut KeywordScanner, "EVIL_MED", "", &VigilConfig::default());
        // under the 10-char floor, never scanned
        assert_eq!(outcome.verdict, Verdict::Allowed);
    }

    #[test]
    fn min_severity_filters_before_verdict() {
        let mut config = VigilConfig::default();
        config.min_severity = "high".to_string();
        let outcome = run_scan(
            &mut KeywordScanner,
            "",
            "EVIL_LOW and EVIL_MED but nothing worse",
            &config,
        );
        assert_eq!(outcome.verdict, Verdict::Allowed);
        assert!(outcome.detections.is_empty());
    }

    #[test]
    fn scanner_error_maps_to_scan_failed() {
        let outcome = run_scan(
            &mut FailingScanner,
            "",
            "long enough text to trigger a scan",
            &VigilConfig::default(),
        );
        assert_eq!(outcome.verdict, Verdict::ScanFailed);
        assert!(outcome.severity.is_none());
        assert!(outcome.rules_matched.is_empty());
    }
}
