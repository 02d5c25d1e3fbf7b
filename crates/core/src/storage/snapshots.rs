use crate::domain::snapshot::{FinancialSnapshot, MonthlyRevenue, TripRecord};
use anyhow::Context;
use chrono::NaiveDate;
use uuid::Uuid;

/// Assembles the read-only evaluation input for one company from its
/// submitted reports and trips.
pub async fn load_financial_snapshot(
    pool: &sqlx::PgPool,
    company_id: Uuid,
) -> anyhow::Result<FinancialSnapshot> {
    let last_submission_date: Option<NaiveDate> = sqlx::query_scalar(
        "SELECT MAX(submitted_on) FROM financial_reports WHERE company_id = $1",
    )
    .bind(company_id)
    .fetch_one(pool)
    .await
    .context("select last submission date failed")?;

    let revenue_rows: Vec<(NaiveDate, f64)> = sqlx::query_as(
        "SELECT period_month, revenue FROM financial_reports \
         WHERE company_id = $1 \
         ORDER BY period_month",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await
    .context("select monthly revenue failed")?;

    let trip_rows: Vec<(Uuid, String, NaiveDate, bool)> = sqlx::query_as(
        "SELECT id, destination, departed_on, documented FROM business_trips \
         WHERE company_id = $1 \
         ORDER BY departed_on, id",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await
    .context("select business trips failed")?;

    Ok(FinancialSnapshot {
        company_id,
        last_submission_date,
        monthly_revenue: revenue_rows
            .into_iter()
            .map(|(month, amount)| MonthlyRevenue { month, amount })
            .collect(),
        trips: trip_rows
            .into_iter()
            .map(|(id, destination, departed_on, documented)| TripRecord {
                id,
                destination,
                departed_on,
                documented,
            })
            .collect(),
    })
}
