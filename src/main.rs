//! exam-billing server binary.
//!
//! Boots configuration, tracing, the Postgres pool and the billing router,
//! then serves until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use axum::routing::get;
use axum::{Json, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use exam_billing::adapters::{
    billing_router, BillingAppState, CachingProviderFactory, JwtSessionValidator,
    PostgresBillingReader, PostgresSettingsStore, PostgresSubscriptionLedger,
    PostgresWebhookEventLog,
};
use exam_billing::adapters::http::AuthState;
use exam_billing::config::{AppConfig, ServerConfig, ValidationError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound provider calls must fail rather than hang a checkout.
const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("exam-billing exited with error: {}", e);
        eprintln!("exam-billing exited with error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server);
    info!(environment = ?config.server.environment, "Configuration loaded");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(config.database.connect_timeout())
        .connect(&config.database.url)
        .await?;
    info!("Postgres connection pool established");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    let http_client = reqwest::Client::builder()
        .timeout(PROVIDER_HTTP_TIMEOUT)
        .build()?;
    let state = BillingAppState::with_settings_store(
        Arc::new(PostgresBillingReader::new(pool.clone())),
        Arc::new(PostgresSubscriptionLedger::new(pool.clone())),
        Arc::new(PostgresWebhookEventLog::new(pool.clone())),
        Arc::new(PostgresSettingsStore::new(pool.clone())),
        config.payment.clone(),
        Arc::new(CachingProviderFactory::new(http_client)),
    );
    let validator: AuthState = Arc::new(JwtSessionValidator::new(&config.auth));

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/billing", billing_router(state, validator))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server)?)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "exam-billing listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("exam-billing stopped");
    Ok(())
}

/// JSON lines in production, compact text elsewhere. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_filter.as_str()));

    if server.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

fn cors_layer(server: &ServerConfig) -> Result<CorsLayer, ValidationError> {
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(server.allowed_origins()?))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
