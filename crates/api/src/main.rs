use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use complia_core::advisor::chat::ChatCompletionClient;
use complia_core::advisor::AdvisorClient;
use complia_core::domain::analysis::AnalysisResult;
use complia_core::engine::ComplianceEngine;
use complia_core::storage;

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

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let advisor: Option<Arc<dyn AdvisorClient>> = match ChatCompletionClient::from_settings(&settings)? {
        Some(client) => Some(Arc::new(client)),
        None => {
            tracing::info!("no advisor credential configured; analyses run on rules alone");
            None
        }
    };
    let engine = ComplianceEngine::new(advisor);

    let state = AppState { pool, engine };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/companies/:company_id/assessments", post(run_assessment))
        .route(
            "/companies/:company_id/assessments/latest",
            get(get_latest_assessment),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pool: Option<PgPool>,
    engine: ComplianceEngine,
}

#[derive(Debug, Serialize)]
struct ApiAssessment {
    assessment_id: Uuid,
    assessment: AnalysisResult,
}

async fn run_assessment(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<ApiAssessment>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let company_id = Uuid::parse_str(&company_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    let acquired = storage::lock::try_acquire_company_lock(pool, company_id)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !acquired {
        return Err(StatusCode::CONFLICT);
    }

    let outcome = analyze_and_persist(pool, &state.engine, company_id).await;
    let _ = storage::lock::release_company_lock(pool, company_id).await;

    match outcome {
        Ok((assessment_id, assessment)) => Ok(Json(ApiAssessment {
            assessment_id,
            assessment,
        })),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(%company_id, error = %e, "analysis run failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn analyze_and_persist(
    pool: &PgPool,
    engine: &ComplianceEngine,
    company_id: Uuid,
) -> anyhow::Result<(Uuid, AnalysisResult)> {
    let rules = storage::rules::fetch_active_rules(pool, company_id).await?;
    let snapshot = storage::snapshots::load_financial_snapshot(pool, company_id).await?;

    let result = engine.analyze(&snapshot, &rules).await?;
    let assessment_id = storage::assessments::persist_assessment(pool, &result).await?;

    tracing::info!(
        %company_id,
        %assessment_id,
        risk_score = result.risk_score,
        violations = result.violations.len(),
        "persisted risk assessment"
    );

    Ok((assessment_id, result))
}

async fn get_latest_assessment(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<ApiAssessment>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let company_id = Uuid::parse_str(&company_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    let (assessment_id, assessment) = storage::assessments::fetch_latest_assessment(pool, company_id)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ApiAssessment {
        assessment_id,
        assessment,
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
