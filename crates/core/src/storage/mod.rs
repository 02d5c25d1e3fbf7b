use anyhow::Context;
use serde::de::DeserializeOwned;

pub mod assessments;
pub mod lock;
pub mod rules;
pub mod snapshots;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Decodes a lowercase text column into one of the serde string enums
/// (severity, frequency, violation kind).
pub(crate) fn decode_enum<T: DeserializeOwned>(raw: &str, what: &'static str) -> anyhow::Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .with_context(|| format!("invalid {what} value in database: {raw}"))
}
