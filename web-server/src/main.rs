//! FraudGuard web server
//!
//! Scores single e-commerce transactions with a trained fraud classifier and
//! serves a statistics dashboard over historical transactions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        FRAUDGUARD                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌──────────────────────────┐ │
//! │  │  Router   │  │  Session  │  │  Services                │ │
//! │  │  (Axum)   │  │  (JWT     │  │  classifier / dataset /  │ │
//! │  │           │  │  cookie)  │  │  dashboard / charts      │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬─────────────┘ │
//! │        └──────────────┼─────────────────────┘               │
//! │                       ▼                                      │
//! │           ┌────────────────────────┐                         │
//! │           │ SQLite users │ CSV/PNG │                         │
//! │           └────────────────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod middleware;
mod services;
mod error;

#[cfg(test)]
mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::{
    compression::CompressionLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use services::charts::{ChartCounts, ChartError, ChartRenderer};
use services::{Classifier, LogisticClassifier, ReferenceDataset};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let json_layer = config.log_json.then(|| tracing_subscriber::fmt::layer().json());
    let pretty_layer = (!config.log_json).then(|| tracing_subscriber::fmt::layer());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "fraudguard_web=debug,tower_http=debug".into()))
        .with(json_layer)
        .with(pretty_layer)
        .init();

    tracing::info!(environment = %config.environment, "FraudGuard starting...");
    tracing::info!("Database: {}", config.database_url);

    // Initialize database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Model artifact and reference data are read once and shared
    let classifier = LogisticClassifier::load(&config.model_path)
        .with_context(|| format!("Failed to load model {}", config.model_path.display()))?;
    let reference = ReferenceDataset::load(&config.reference_data_path)
        .with_context(|| format!(
            "Failed to load reference dataset {}",
            config.reference_data_path.display()
        ))?;

    let charts = ChartRenderer::new(config.chart_font_path.as_deref());

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
        classifier: Arc::new(classifier),
        reference: Arc::new(reference),
        charts,
    };

    if let Ok(counts) = render_startup_charts(&state) {
        tracing::info!(fraud = counts.fraud, legal = counts.legal, "Startup charts rendered");
    }

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub config: config::Config,
    pub classifier: Arc<dyn Classifier>,
    pub reference: Arc<ReferenceDataset>,
    pub charts: ChartRenderer,
}

/// Draw the dashboard charts from the reference dataset so the images
/// exist before the first dashboard visit. Failure is logged only.
fn render_startup_charts(state: &AppState) -> Result<ChartCounts, ChartError> {
    let result = state
        .charts
        .render_dashboard_charts(state.reference.records(), &state.config.chart_dir());
    if let Err(e) = &result {
        tracing::warn!("Startup chart rendering failed: {}", e);
    }
    result
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/about", get(handlers::pages::about))
        .route("/login", get(handlers::auth::login_page).post(handlers::auth::login))
        .route("/register", get(handlers::auth::register_page).post(handlers::auth::register))
        .nest_service("/static", ServeDir::new(&state.config.static_dir));

    // Signed-in routes
    let session_routes = Router::new()
        .route("/", get(handlers::home::index))
        .route("/predict", post(handlers::home::predict))
        .route("/dashboard", get(handlers::dashboard::show))
        .route("/logout", get(handlers::auth::logout))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth
        ));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
