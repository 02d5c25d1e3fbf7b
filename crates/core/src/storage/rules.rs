use crate::domain::rule::ComplianceRule;
use crate::storage::decode_enum;
use anyhow::Context;
use uuid::Uuid;

/// Active rules for one company, in creation order. The JSONB definition
/// column decodes straight into the tagged `RuleKind`.
pub async fn fetch_active_rules(
    pool: &sqlx::PgPool,
    company_id: Uuid,
) -> anyhow::Result<Vec<ComplianceRule>> {
    let rows = sqlx::query_as::<_, (Uuid, String, String, String, String, i64, serde_json::Value)>(
        "SELECT id, name, category, severity, frequency, deadline_days, definition \
         FROM compliance_rules \
         WHERE company_id = $1 AND active \
         ORDER BY created_at, id",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await
    .context("select compliance_rules failed")?;

    rows.into_iter()
        .map(
            |(id, name, category, severity, frequency, deadline_days, definition)| {
                Ok(ComplianceRule {
                    id,
                    name,
                    category,
                    severity: decode_enum(&severity, "severity")?,
                    frequency: decode_enum(&frequency, "frequency")?,
                    deadline_days,
                    kind: serde_json::from_value(definition)
                        .with_context(|| format!("invalid rule definition for rule {id}"))?,
                })
            },
        )
        .collect()
}

/// Companies the worker should sweep: anyone with at least one active rule.
pub async fn companies_with_active_rules(pool: &sqlx::PgPool) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT DISTINCT company_id FROM compliance_rules WHERE active ORDER BY company_id",
    )
    .fetch_all(pool)
    .await
    .context("select companies with active rules failed")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
