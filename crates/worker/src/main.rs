use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use complia_core::advisor::chat::ChatCompletionClient;
use complia_core::advisor::AdvisorClient;
use complia_core::engine::ComplianceEngine;
use complia_core::storage;

#[derive(Debug, Parser)]
#[command(name = "complia_worker")]
struct Args {
    /// Analyze a single company. Defaults to every company with active rules.
    #[arg(long)]
    company_id: Option<String>,

    /// Do everything except writing assessments to the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = complia_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    storage::migrate(&pool).await?;

    let advisor: Option<Arc<dyn AdvisorClient>> = match ChatCompletionClient::from_settings(&settings)? {
        Some(client) => Some(Arc::new(client)),
        None => {
            tracing::info!("no advisor credential configured; analyses run on rules alone");
            None
        }
    };
    let engine = ComplianceEngine::new(advisor);

    let companies = match args.company_id.as_deref() {
        Some(raw) => vec![Uuid::parse_str(raw).context("invalid --company-id")?],
        None => storage::rules::companies_with_active_rules(&pool).await?,
    };

    if companies.is_empty() {
        tracing::warn!("no companies with active rules; nothing to do");
        return Ok(());
    }

    for company_id in companies {
        let acquired = storage::lock::try_acquire_company_lock(&pool, company_id).await?;
        if !acquired {
            tracing::warn!(%company_id, "company lock not acquired; another run in progress");
            continue;
        }

        let run = run_analysis(&pool, &engine, company_id, args.dry_run).await;
        if let Err(err) = run {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%company_id, error = %err, "analysis run failed");

            if !args.dry_run {
                let generated_at = chrono::Utc::now();
                if let Err(persist_err) = storage::assessments::persist_failure(
                    &pool,
                    company_id,
                    generated_at,
                    &format!("{:#}", err),
                )
                .await
                {
                    tracing::error!(%company_id, error = %persist_err, "failed to record failed run");
                }
            }
        }

        let _ = storage::lock::release_company_lock(&pool, company_id).await;
    }

    Ok(())
}

async fn run_analysis(
    pool: &sqlx::PgPool,
    engine: &ComplianceEngine,
    company_id: Uuid,
    dry_run: bool,
) -> anyhow::Result<()> {
    let rules = storage::rules::fetch_active_rules(pool, company_id).await?;
    let snapshot = storage::snapshots::load_financial_snapshot(pool, company_id).await?;

    let result = engine.analyze(&snapshot, &rules).await?;

    if dry_run {
        tracing::info!(
            %company_id,
            dry_run = true,
            rules = rules.len(),
            risk_score = result.risk_score,
            violations = result.violations.len(),
            anomalies = result.anomalies.len(),
            "analysis complete (not persisted)"
        );
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let assessment_id = storage::assessments::persist_assessment(pool, &result).await?;
    tracing::info!(
        %company_id,
        %assessment_id,
        risk_score = result.risk_score,
        violations = result.violations.len(),
        "persisted risk assessment"
    );

    Ok(())
}

fn init_sentry(settings: &complia_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
