use crate::domain::rule::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_RISK_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingSubmission,
    OverdueSubmission,
    MissingRevenueData,
    LowRevenue,
    UndocumentedTrip,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::MissingSubmission => "missing_submission",
            ViolationKind::OverdueSubmission => "overdue_submission",
            ViolationKind::MissingRevenueData => "missing_revenue_data",
            ViolationKind::LowRevenue => "low_revenue",
            ViolationKind::UndocumentedTrip => "undocumented_trip",
        }
    }
}

/// One concrete failure of one rule, frozen at detection time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: Uuid,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub confidence: f64,
}

/// Advisor-flagged pattern outside the deterministic rule set. The kind is
/// free text because the advisor invents its own taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: Option<f64>,
}

impl Anomaly {
    /// One-line rendering used for the result's insights list.
    pub fn summary(&self) -> String {
        format!("[{}] {}: {}", self.severity.as_str(), self.kind, self.description)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Severity,
    pub action: String,
    pub description: String,
    pub timeline: String,
}

/// Terminal output of one orchestration pass. Ephemeral; callers persist it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub company_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub violations: Vec<Violation>,
    pub anomalies: Vec<Anomaly>,
    pub insights: Vec<String>,
    pub risk_score: u8,
    pub recommendations: Vec<Recommendation>,
}
