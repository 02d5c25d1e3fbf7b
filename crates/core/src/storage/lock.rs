use anyhow::Context;
use uuid::Uuid;

// Advisory locks are scoped to the Postgres session. This is used as a best-effort guard against
// concurrent analysis runs for the same company.
const LOCK_NAMESPACE: i64 = 0x434F_4D50_4C49; // "COMPLI" as hex-ish namespace.

fn lock_key_for_company(company_id: Uuid) -> i64 {
    let (hi, lo) = company_id.as_u64_pair();
    LOCK_NAMESPACE ^ ((hi ^ lo) as i64)
}

pub async fn try_acquire_company_lock(
    pool: &sqlx::PgPool,
    company_id: Uuid,
) -> anyhow::Result<bool> {
    let key = lock_key_for_company(company_id);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_company_lock(pool: &sqlx::PgPool, company_id: Uuid) -> anyhow::Result<()> {
    let key = lock_key_for_company(company_id);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to release advisory lock (key={key})"))?;
    Ok(())
}
