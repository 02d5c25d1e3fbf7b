use crate::domain::analysis::{Anomaly, Violation, MAX_RISK_SCORE};
use crate::domain::rule::Severity;

// Anomalies without a confidence count at half weight.
const DEFAULT_ANOMALY_CONFIDENCE: f64 = 0.5;

fn violation_points(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 25.0,
        Severity::High => 15.0,
        Severity::Medium => 10.0,
        Severity::Low => 5.0,
    }
}

fn anomaly_points(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 20.0,
        Severity::High => 12.0,
        Severity::Medium => 8.0,
        Severity::Low => 3.0,
    }
}

/// Aggregates violations and anomalies into a bounded score. All terms are
/// non-negative, so the result is in 0..=100.
pub fn risk_score(violations: &[Violation], anomalies: &[Anomaly]) -> u8 {
    let mut total = 0.0;

    for violation in violations {
        total += violation_points(violation.severity);
    }

    for anomaly in anomalies {
        let confidence = anomaly.confidence.unwrap_or(DEFAULT_ANOMALY_CONFIDENCE);
        total += anomaly_points(anomaly.severity) * confidence;
    }

    (total.round() as u64).min(MAX_RISK_SCORE as u64) as u8
}
