use crate::advisor::AdvisorClient;
use crate::domain::analysis::{AnalysisResult, Anomaly};
use crate::domain::rule::ComplianceRule;
use crate::domain::snapshot::FinancialSnapshot;
use chrono::Utc;
use std::sync::Arc;

pub mod evaluate;
pub mod score;

/// Runs one end-to-end analysis pass: deterministic rules first, then the
/// advisor, then the aggregate score. Advisor failures degrade to empty
/// output; the caller always gets a scored result.
#[derive(Clone)]
pub struct ComplianceEngine {
    advisor: Option<Arc<dyn AdvisorClient>>,
}

impl ComplianceEngine {
    pub fn new(advisor: Option<Arc<dyn AdvisorClient>>) -> Self {
        Self { advisor }
    }

    pub fn advisor_configured(&self) -> bool {
        self.advisor.is_some()
    }

    pub async fn analyze(
        &self,
        snapshot: &FinancialSnapshot,
        rules: &[ComplianceRule],
    ) -> anyhow::Result<AnalysisResult> {
        let now = Utc::now();

        let mut violations = Vec::new();
        for rule in rules {
            match evaluate::evaluate_rule(rule, snapshot, now) {
                Ok(Some(violation)) => violations.push(violation),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        rule_name = %rule.name,
                        error = %err,
                        "rule evaluation failed; skipping rule"
                    );
                }
            }
        }

        let anomalies = match &self.advisor {
            Some(advisor) => match advisor.detect_anomalies(snapshot).await {
                Ok(anomalies) => anomalies,
                Err(err) => {
                    tracing::warn!(
                        company_id = %snapshot.company_id,
                        error = %err,
                        "anomaly detection failed; continuing without anomalies"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let insights: Vec<String> = anomalies.iter().map(Anomaly::summary).collect();
        let risk_score = score::risk_score(&violations, &anomalies);

        let recommendations = match &self.advisor {
            Some(advisor) if !violations.is_empty() => {
                match advisor
                    .generate_recommendations(snapshot, &violations, &anomalies)
                    .await
                {
                    Ok(recommendations) => recommendations,
                    Err(err) => {
                        tracing::warn!(
                            company_id = %snapshot.company_id,
                            error = %err,
                            "recommendation generation failed; continuing without recommendations"
                        );
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };

        Ok(AnalysisResult {
            company_id: snapshot.company_id,
            generated_at: now,
            violations,
            anomalies,
            insights,
            risk_score,
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{Recommendation, Violation};
    use crate::domain::rule::{RuleFrequency, RuleKind, Severity};
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct StubAdvisor {
        anomalies: Vec<Anomaly>,
        recommendations: Vec<Recommendation>,
        fail: bool,
        recommendation_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AdvisorClient for StubAdvisor {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn detect_anomalies(
            &self,
            _snapshot: &FinancialSnapshot,
        ) -> anyhow::Result<Vec<Anomaly>> {
            if self.fail {
                bail!("stub advisor is down");
            }
            Ok(self.anomalies.clone())
        }

        async fn generate_recommendations(
            &self,
            _snapshot: &FinancialSnapshot,
            _violations: &[Violation],
            _anomalies: &[Anomaly],
        ) -> anyhow::Result<Vec<Recommendation>> {
            self.recommendation_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("stub advisor is down");
            }
            Ok(self.recommendations.clone())
        }
    }

    fn submission_rule(severity: Severity) -> ComplianceRule {
        ComplianceRule {
            id: Uuid::new_v4(),
            name: "monthly report".to_string(),
            category: "reporting".to_string(),
            severity,
            frequency: RuleFrequency::Monthly,
            deadline_days: 30,
            kind: RuleKind::ReportSubmission,
        }
    }

    #[tokio::test]
    async fn empty_inputs_yield_an_empty_zero_score_result() {
        let engine = ComplianceEngine::new(None);
        let snapshot = FinancialSnapshot::empty(Uuid::new_v4());

        let result = engine.analyze(&snapshot, &[]).await.unwrap();
        assert!(result.violations.is_empty());
        assert!(result.anomalies.is_empty());
        assert!(result.insights.is_empty());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.risk_score, 0);
    }

    #[tokio::test]
    async fn without_an_advisor_the_score_comes_from_rules_alone() {
        let engine = ComplianceEngine::new(None);
        let snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        let rules = vec![submission_rule(Severity::High)];

        let result = engine.analyze(&snapshot, &rules).await.unwrap();
        assert_eq!(result.violations.len(), 1);
        assert!(result.insights.is_empty());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.risk_score, 15);
    }

    #[tokio::test]
    async fn advisor_failure_degrades_to_empty_output() {
        let advisor = Arc::new(StubAdvisor {
            fail: true,
            ..Default::default()
        });
        let engine = ComplianceEngine::new(Some(advisor));
        let snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        let rules = vec![submission_rule(Severity::Critical)];

        let result = engine.analyze(&snapshot, &rules).await.unwrap();
        assert_eq!(result.violations.len(), 1);
        assert!(result.anomalies.is_empty());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.risk_score, 25);
    }

    #[tokio::test]
    async fn anomalies_feed_insights_and_the_score() {
        let advisor = Arc::new(StubAdvisor {
            anomalies: vec![Anomaly {
                kind: "revenue_spike".to_string(),
                description: "revenue tripled month over month".to_string(),
                severity: Severity::High,
                confidence: Some(1.0),
            }],
            ..Default::default()
        });
        let engine = ComplianceEngine::new(Some(advisor));
        let snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        let rules = vec![submission_rule(Severity::High)];

        let result = engine.analyze(&snapshot, &rules).await.unwrap();
        assert_eq!(result.anomalies.len(), 1);
        assert_eq!(result.insights.len(), 1);
        assert!(result.insights[0].contains("revenue_spike"));
        // high violation 15 + high anomaly 12 * 1.0
        assert_eq!(result.risk_score, 27);
    }

    #[tokio::test]
    async fn recommendations_are_only_requested_when_violations_exist() {
        let advisor = Arc::new(StubAdvisor {
            recommendations: vec![Recommendation {
                priority: Severity::High,
                action: "submit the overdue report".to_string(),
                description: "file the missing monthly compliance report".to_string(),
                timeline: "7 days".to_string(),
            }],
            ..Default::default()
        });
        let engine = ComplianceEngine::new(Some(advisor.clone()));

        // Clean snapshot, rule satisfied: no violations, no recommendation call.
        let mut snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        snapshot.last_submission_date = Some(Utc::now().date_naive());
        let rules = vec![submission_rule(Severity::High)];

        let result = engine.analyze(&snapshot, &rules).await.unwrap();
        assert!(result.violations.is_empty());
        assert!(result.recommendations.is_empty());
        assert_eq!(advisor.recommendation_calls.load(Ordering::SeqCst), 0);

        // Empty snapshot: the rule fires and recommendations come back.
        let snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        let result = engine.analyze(&snapshot, &rules).await.unwrap();
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(advisor.recommendation_calls.load(Ordering::SeqCst), 1);
    }
}
