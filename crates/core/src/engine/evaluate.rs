use crate::domain::analysis::{Violation, ViolationKind};
use crate::domain::rule::{ComplianceRule, RuleKind, Severity};
use crate::domain::snapshot::FinancialSnapshot;
use chrono::{DateTime, Utc};

pub const DEFAULT_REVENUE_THRESHOLD: f64 = 10_000.0;

// Revenue checks look at the trailing window of monthly entries.
const REVENUE_WINDOW_MONTHS: usize = 3;

/// Applies one rule to the snapshot. Returns at most one violation; errors are
/// per-rule and the caller is expected to log and continue.
pub fn evaluate_rule(
    rule: &ComplianceRule,
    snapshot: &FinancialSnapshot,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<Violation>> {
    match &rule.kind {
        RuleKind::ReportSubmission => Ok(evaluate_report_submission(rule, snapshot, now)),
        RuleKind::RevenueTracking { threshold } => {
            Ok(evaluate_revenue_tracking(rule, snapshot, *threshold, now))
        }
        RuleKind::TaxCompliance => {
            // No tax fields exist on the snapshot yet; this variant is an
            // extension point until a filing-date source is wired in.
            tracing::debug!(rule_id = %rule.id, "tax_compliance rule has no snapshot fields; skipping");
            Ok(None)
        }
        RuleKind::TripDocumentation => Ok(evaluate_trip_documentation(rule, snapshot, now)),
    }
}

fn evaluate_report_submission(
    rule: &ComplianceRule,
    snapshot: &FinancialSnapshot,
    now: DateTime<Utc>,
) -> Option<Violation> {
    let Some(last_submission) = snapshot.last_submission_date else {
        return Some(Violation {
            rule_id: rule.id,
            kind: ViolationKind::MissingSubmission,
            severity: rule.severity,
            description: "No compliance report has ever been submitted".to_string(),
            detected_at: now,
            confidence: 1.0,
        });
    };

    let days_since = (now.date_naive() - last_submission).num_days();
    if days_since > rule.deadline_days {
        let overdue = days_since - rule.deadline_days;
        return Some(Violation {
            rule_id: rule.id,
            kind: ViolationKind::OverdueSubmission,
            severity: rule.severity,
            description: format!(
                "Report submission is {overdue} days overdue (last submitted {last_submission})"
            ),
            detected_at: now,
            confidence: 1.0,
        });
    }

    None
}

fn evaluate_revenue_tracking(
    rule: &ComplianceRule,
    snapshot: &FinancialSnapshot,
    threshold: Option<f64>,
    now: DateTime<Utc>,
) -> Option<Violation> {
    if snapshot.monthly_revenue.is_empty() {
        return Some(Violation {
            rule_id: rule.id,
            kind: ViolationKind::MissingRevenueData,
            severity: rule.severity,
            description: "No monthly revenue data on record".to_string(),
            detected_at: now,
            confidence: 1.0,
        });
    }

    let threshold = threshold.unwrap_or(DEFAULT_REVENUE_THRESHOLD);
    let window_start = snapshot
        .monthly_revenue
        .len()
        .saturating_sub(REVENUE_WINDOW_MONTHS);
    let window = &snapshot.monthly_revenue[window_start..];
    let mean = window.iter().map(|m| m.amount).sum::<f64>() / window.len() as f64;

    if mean < threshold {
        // Low revenue is a signal, not a breach; its severity is fixed and
        // does not inherit the rule's own.
        return Some(Violation {
            rule_id: rule.id,
            kind: ViolationKind::LowRevenue,
            severity: Severity::Medium,
            description: format!(
                "Average monthly revenue {mean:.2} over the last {} months is below the {threshold:.2} threshold",
                window.len()
            ),
            detected_at: now,
            confidence: 0.85,
        });
    }

    None
}

fn evaluate_trip_documentation(
    rule: &ComplianceRule,
    snapshot: &FinancialSnapshot,
    now: DateTime<Utc>,
) -> Option<Violation> {
    let undocumented = snapshot.trips.iter().filter(|t| !t.documented).count();
    if undocumented == 0 {
        return None;
    }

    Some(Violation {
        rule_id: rule.id,
        kind: ViolationKind::UndocumentedTrip,
        severity: rule.severity,
        description: format!("{undocumented} business trip(s) lack required documentation"),
        detected_at: now,
        confidence: 1.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::RuleFrequency;
    use crate::domain::snapshot::{MonthlyRevenue, TripRecord};
    use chrono::{Duration, NaiveDate, TimeZone};
    use uuid::Uuid;

    fn rule(kind: RuleKind, severity: Severity) -> ComplianceRule {
        ComplianceRule {
            id: Uuid::new_v4(),
            name: "test rule".to_string(),
            category: "reporting".to_string(),
            severity,
            frequency: RuleFrequency::Monthly,
            deadline_days: 30,
            kind,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn revenue_series(amounts: &[f64]) -> Vec<MonthlyRevenue> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| MonthlyRevenue {
                month: NaiveDate::from_ymd_opt(2025, 1 + i as u32, 1).unwrap(),
                amount,
            })
            .collect()
    }

    #[test]
    fn missing_submission_when_no_date_on_record() {
        let rule = rule(RuleKind::ReportSubmission, Severity::High);
        let snapshot = FinancialSnapshot::empty(Uuid::new_v4());

        let violation = evaluate_rule(&rule, &snapshot, now()).unwrap().unwrap();
        assert_eq!(violation.kind, ViolationKind::MissingSubmission);
        assert_eq!(violation.severity, Severity::High);
        assert_eq!(violation.confidence, 1.0);
    }

    #[test]
    fn overdue_submission_reports_the_overage() {
        let rule = rule(RuleKind::ReportSubmission, Severity::High);
        let mut snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        snapshot.last_submission_date = Some(now().date_naive() - Duration::days(40));

        let violation = evaluate_rule(&rule, &snapshot, now()).unwrap().unwrap();
        assert_eq!(violation.kind, ViolationKind::OverdueSubmission);
        assert!(
            violation.description.contains("10 days overdue"),
            "description was: {}",
            violation.description
        );
    }

    #[test]
    fn submission_within_deadline_is_clean() {
        let rule = rule(RuleKind::ReportSubmission, Severity::High);
        let mut snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        snapshot.last_submission_date = Some(now().date_naive() - Duration::days(30));

        assert!(evaluate_rule(&rule, &snapshot, now()).unwrap().is_none());
    }

    #[test]
    fn missing_revenue_data_when_series_is_empty() {
        let rule = rule(RuleKind::RevenueTracking { threshold: None }, Severity::Low);
        let snapshot = FinancialSnapshot::empty(Uuid::new_v4());

        let violation = evaluate_rule(&rule, &snapshot, now()).unwrap().unwrap();
        assert_eq!(violation.kind, ViolationKind::MissingRevenueData);
        assert_eq!(violation.confidence, 1.0);
    }

    #[test]
    fn low_revenue_forces_medium_severity() {
        let rule = rule(
            RuleKind::RevenueTracking {
                threshold: Some(10_000.0),
            },
            Severity::Critical,
        );
        let mut snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        snapshot.monthly_revenue = revenue_series(&[50_000.0, 9_000.0, 8_000.0, 7_000.0]);

        let violation = evaluate_rule(&rule, &snapshot, now()).unwrap().unwrap();
        assert_eq!(violation.kind, ViolationKind::LowRevenue);
        assert_eq!(violation.severity, Severity::Medium);
        assert_eq!(violation.confidence, 0.85);
    }

    #[test]
    fn only_the_last_three_months_count() {
        let rule = rule(RuleKind::RevenueTracking { threshold: None }, Severity::Low);
        let mut snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        // Old months are terrible, recent three are healthy.
        snapshot.monthly_revenue = revenue_series(&[100.0, 100.0, 20_000.0, 20_000.0, 20_000.0]);

        assert!(evaluate_rule(&rule, &snapshot, now()).unwrap().is_none());
    }

    #[test]
    fn default_threshold_applies_when_unset() {
        let rule = rule(RuleKind::RevenueTracking { threshold: None }, Severity::Low);
        let mut snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        snapshot.monthly_revenue = revenue_series(&[8_000.0, 8_000.0, 8_000.0]);

        let violation = evaluate_rule(&rule, &snapshot, now()).unwrap().unwrap();
        assert_eq!(violation.kind, ViolationKind::LowRevenue);
    }

    #[test]
    fn tax_compliance_is_an_inert_extension_point() {
        let rule = rule(RuleKind::TaxCompliance, Severity::Critical);
        let snapshot = FinancialSnapshot::empty(Uuid::new_v4());

        assert!(evaluate_rule(&rule, &snapshot, now()).unwrap().is_none());
    }

    #[test]
    fn undocumented_trips_are_flagged() {
        let rule = rule(RuleKind::TripDocumentation, Severity::High);
        let mut snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        snapshot.trips = vec![
            TripRecord {
                id: Uuid::new_v4(),
                destination: "Berlin".to_string(),
                departed_on: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                documented: true,
            },
            TripRecord {
                id: Uuid::new_v4(),
                destination: "Vilnius".to_string(),
                departed_on: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
                documented: false,
            },
        ];

        let violation = evaluate_rule(&rule, &snapshot, now()).unwrap().unwrap();
        assert_eq!(violation.kind, ViolationKind::UndocumentedTrip);
        assert!(violation.description.contains("1 business trip"));
    }

    #[test]
    fn fully_documented_trips_are_clean() {
        let rule = rule(RuleKind::TripDocumentation, Severity::High);
        let mut snapshot = FinancialSnapshot::empty(Uuid::new_v4());
        snapshot.trips = vec![TripRecord {
            id: Uuid::new_v4(),
            destination: "Berlin".to_string(),
            departed_on: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            documented: true,
        }];

        assert!(evaluate_rule(&rule, &snapshot, now()).unwrap().is_none());
    }
}
