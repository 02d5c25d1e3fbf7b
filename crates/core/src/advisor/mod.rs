use crate::domain::analysis::{Anomaly, Recommendation, Violation};
use crate::domain::snapshot::FinancialSnapshot;

pub mod chat;
pub mod error;
pub mod json;

/// Seam for the hosted-model advisor so the engine can be exercised with a
/// substitute transport in tests.
#[async_trait::async_trait]
pub trait AdvisorClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect_anomalies(
        &self,
        snapshot: &FinancialSnapshot,
    ) -> anyhow::Result<Vec<Anomaly>>;

    async fn generate_recommendations(
        &self,
        snapshot: &FinancialSnapshot,
        violations: &[Violation],
        anomalies: &[Anomaly],
    ) -> anyhow::Result<Vec<Recommendation>>;
}
