use crate::domain::analysis::{Anomaly, Recommendation};
use crate::domain::rule::Severity;
use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Raw advisor output entries. These mirror what the model is instructed to
/// emit; `validate_into_*` is the only way to turn them into domain values.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorAnomalyEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorRecommendationEntry {
    pub priority: Severity,
    pub action: String,
    pub description: String,
    pub timeline: String,
}

impl AdvisorAnomalyEntry {
    pub fn validate_into_anomaly(self) -> anyhow::Result<Anomaly> {
        let kind = self.kind.trim().to_string();
        ensure!(!kind.is_empty(), "anomaly type must be non-empty");

        let description = self.description.trim().to_string();
        ensure!(!description.is_empty(), "anomaly description must be non-empty");

        if let Some(confidence) = self.confidence {
            ensure!(
                (0.0..=1.0).contains(&confidence),
                "anomaly confidence must be between 0 and 1 (got {confidence})"
            );
        }

        Ok(Anomaly {
            kind,
            description,
            severity: self.severity,
            confidence: self.confidence,
        })
    }
}

impl AdvisorRecommendationEntry {
    pub fn validate_into_recommendation(self) -> anyhow::Result<Recommendation> {
        let action = self.action.trim().to_string();
        ensure!(!action.is_empty(), "recommendation action must be non-empty");

        let description = self.description.trim().to_string();
        ensure!(
            !description.is_empty(),
            "recommendation description must be non-empty"
        );

        let timeline = self.timeline.trim().to_string();
        ensure!(!timeline.is_empty(), "recommendation timeline must be non-empty");

        Ok(Recommendation {
            priority: self.priority,
            action,
            description,
            timeline,
        })
    }
}
