use crate::record::{Detection, Severity, Verdict};
use std::collections::HashSet;

/// Reduce a detection batch to a single verdict and severity.
///
/// Precedence: any `high` detection blocks; otherwise any `medium` warns at
/// medium; otherwise a non-empty batch warns at low. Unrecognized severity
/// strings fall through to the low bucket, and a missing severity counts as
/// `medium`. An empty batch is `allowed` with no severity.
pub fn assign_verdict(detections: &[Detection]) -> (Verdict, Option<Severity>) {
    if detections.is_empty() {
        return (Verdict::Allowed, None);
    }
    let severities: Vec<&str> = detections
        .iter()
        .map(|d| d.severity.as_deref().unwrap_or("medium"))
        .collect();
    if severities.iter().any(|s| *s == "high") {
        (Verdict::Blocked, Some(Severity::High))
    } else if severities.iter().any(|s| *s == "medium") {
        (Verdict::Warned, Some(Severity::Medium))
    } else {
        (Verdict::Warned, Some(Severity::Low))
    }
}

/// Rule identifiers for a detection batch; missing names become `"unknown"`.
pub fn matched_rules(detections: &[Detection]) -> Vec<String> {
    detections
        .iter()
        .map(|d| d.rule_name.clone().unwrap_or_else(|| "unknown".to_string()))
        .collect()
}

/// Drop repeat detections of the same rule, keeping first-seen order.
pub fn dedup_by_rule(detections: Vec<Detection>) -> Vec<Detection> {
    let mut seen = HashSet::new();
    detections
        .into_iter()
        .filter(|d| {
            let key = d.rule_name.clone().unwrap_or_else(|| "unknown".to_string());
            seen.insert(key)
        })
        .collect()
}

fn severity_rank(severity: &str) -> u8 {
    match severity {
        "low" => 0,
        "medium" => 1,
        "high" => 2,
        // Unrecognized values rank as medium here (distinct from the
        // low-bucket fallback in assign_verdict)
        _ => 1,
    }
}

/// Keep detections at or above `min_severity` ("low"/"medium"/"high");
/// an unrecognized minimum admits everything.
pub fn filter_by_severity(detections: Vec<Detection>, min_severity: &str) -> Vec<Detection> {
    let min = match min_severity.to_lowercase().as_str() {
        "low" => 0,
        "medium" => 1,
        "high" => 2,
        _ => 0,
    };
    detections
        .into_iter()
        .filter(|d| {
            let severity = d
                .severity
                .as_deref()
                .unwrap_or("medium")
                .to_lowercase();
            severity_rank(&severity) >= min
        })
        .collect()
}
