use crate::domain::analysis::{AnalysisResult, Violation};
use crate::storage::decode_enum;
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persists one successful analysis pass: the assessment row plus one row per
/// violation, atomically.
pub async fn persist_assessment(
    pool: &sqlx::PgPool,
    result: &AnalysisResult,
) -> anyhow::Result<Uuid> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let anomalies =
        serde_json::to_value(&result.anomalies).context("serialize anomalies failed")?;
    let insights = serde_json::to_value(&result.insights).context("serialize insights failed")?;
    let recommendations = serde_json::to_value(&result.recommendations)
        .context("serialize recommendations failed")?;

    let assessment_id: Uuid = sqlx::query_scalar(
        "INSERT INTO risk_assessments \
           (company_id, generated_at, status, error, risk_score, anomalies, insights, recommendations) \
         VALUES ($1, $2, 'success', NULL, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(result.company_id)
    .bind(result.generated_at)
    .bind(result.risk_score as i32)
    .bind(anomalies)
    .bind(insights)
    .bind(recommendations)
    .fetch_one(&mut *tx)
    .await
    .context("insert risk_assessments failed")?;

    for violation in &result.violations {
        insert_violation(&mut tx, assessment_id, violation).await?;
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(assessment_id)
}

/// Records a run that aborted before producing a result.
pub async fn persist_failure(
    pool: &sqlx::PgPool,
    company_id: Uuid,
    generated_at: DateTime<Utc>,
    error: &str,
) -> anyhow::Result<Uuid> {
    let assessment_id: Uuid = sqlx::query_scalar(
        "INSERT INTO risk_assessments \
           (company_id, generated_at, status, error, risk_score, anomalies, insights, recommendations) \
         VALUES ($1, $2, 'error', $3, NULL, NULL, NULL, NULL) \
         RETURNING id",
    )
    .bind(company_id)
    .bind(generated_at)
    .bind(error)
    .fetch_one(pool)
    .await
    .context("insert error risk_assessments failed")?;

    Ok(assessment_id)
}

async fn insert_violation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    assessment_id: Uuid,
    violation: &Violation,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO compliance_violations \
           (assessment_id, rule_id, kind, severity, description, detected_at, confidence) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(assessment_id)
    .bind(violation.rule_id)
    .bind(violation.kind.as_str())
    .bind(violation.severity.as_str())
    .bind(&violation.description)
    .bind(violation.detected_at)
    .bind(violation.confidence)
    .execute(&mut **tx)
    .await
    .context("insert compliance_violations failed")?;

    Ok(())
}

/// Latest successful assessment for a company, rebuilt into the domain shape.
pub async fn fetch_latest_assessment(
    pool: &sqlx::PgPool,
    company_id: Uuid,
) -> anyhow::Result<Option<(Uuid, AnalysisResult)>> {
    let row = sqlx::query_as::<
        _,
        (
            Uuid,
            DateTime<Utc>,
            i32,
            serde_json::Value,
            serde_json::Value,
            serde_json::Value,
        ),
    >(
        "SELECT id, generated_at, risk_score, anomalies, insights, recommendations \
         FROM risk_assessments \
         WHERE company_id = $1 AND status = 'success' \
         ORDER BY generated_at DESC \
         LIMIT 1",
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await
    .context("select risk_assessments failed")?;

    let Some((id, generated_at, risk_score, anomalies, insights, recommendations)) = row else {
        return Ok(None);
    };

    let violations = fetch_violations(pool, id).await?;

    let result = AnalysisResult {
        company_id,
        generated_at,
        violations,
        anomalies: serde_json::from_value(anomalies).context("decode stored anomalies failed")?,
        insights: serde_json::from_value(insights).context("decode stored insights failed")?,
        risk_score: u8::try_from(risk_score).context("stored risk_score out of range")?,
        recommendations: serde_json::from_value(recommendations)
            .context("decode stored recommendations failed")?,
    };

    Ok(Some((id, result)))
}

async fn fetch_violations(
    pool: &sqlx::PgPool,
    assessment_id: Uuid,
) -> anyhow::Result<Vec<Violation>> {
    let rows = sqlx::query_as::<_, (Uuid, String, String, String, DateTime<Utc>, f64)>(
        "SELECT rule_id, kind, severity, description, detected_at, confidence \
         FROM compliance_violations \
         WHERE assessment_id = $1 \
         ORDER BY detected_at, rule_id",
    )
    .bind(assessment_id)
    .fetch_all(pool)
    .await
    .context("select compliance_violations failed")?;

    rows.into_iter()
        .map(
            |(rule_id, kind, severity, description, detected_at, confidence)| {
                Ok(Violation {
                    rule_id,
                    kind: decode_enum(&kind, "violation kind")?,
                    severity: decode_enum(&severity, "severity")?,
                    description,
                    detected_at,
                    confidence,
                })
            },
        )
        .collect()
}
