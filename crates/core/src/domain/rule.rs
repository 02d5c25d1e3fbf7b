use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

/// Declarative check carried by a rule. The tag decides which snapshot fields
/// the evaluator looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    ReportSubmission,
    RevenueTracking {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
    },
    TaxCompliance,
    TripDocumentation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub severity: Severity,
    pub frequency: RuleFrequency,
    /// Days after the reference event before the rule counts as overdue.
    pub deadline_days: i64,
    pub kind: RuleKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rule_kind_decodes_from_tagged_json() {
        let kind: RuleKind =
            serde_json::from_value(json!({"type": "revenue_tracking", "threshold": 25000.0}))
                .unwrap();
        assert_eq!(
            kind,
            RuleKind::RevenueTracking {
                threshold: Some(25000.0)
            }
        );

        let kind: RuleKind = serde_json::from_value(json!({"type": "report_submission"})).unwrap();
        assert_eq!(kind, RuleKind::ReportSubmission);
    }

    #[test]
    fn revenue_threshold_is_optional() {
        let kind: RuleKind = serde_json::from_value(json!({"type": "revenue_tracking"})).unwrap();
        assert_eq!(kind, RuleKind::RevenueTracking { threshold: None });
    }

    #[test]
    fn severity_decodes_lowercase() {
        let sev: Severity = serde_json::from_value(json!("critical")).unwrap();
        assert_eq!(sev, Severity::Critical);
    }
}
