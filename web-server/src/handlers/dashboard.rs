//! Dashboard handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::middleware::auth::UserContext;
use crate::services::charts::{BROWSER_CHART, COUNTRY_CHART, PIE_CHART};
use crate::services::dashboard::{build_dashboard, DashboardStats};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct ChartUrls {
    pub fraud_vs_legal: String,
    pub top_fraud_countries: String,
    pub fraud_by_browser: String,
}

impl ChartUrls {
    fn new() -> Self {
        let url = |name: &str| format!("/static/images/{name}");
        Self {
            fraud_vs_legal: url(PIE_CHART),
            top_fraud_countries: url(COUNTRY_CHART),
            fraud_by_browser: url(BROWSER_CHART),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub charts: ChartUrls,
}

/// Re-read the dashboard CSV, redraw the charts, and return the aggregates
pub async fn show(State(state): State<AppState>, user: UserContext) -> AppResult<Json<DashboardView>> {
    let csv_path = state.config.dashboard_data_path.clone();
    let chart_dir = state.config.chart_dir();
    let charts = state.charts;

    let stats = tokio::task::spawn_blocking(move || build_dashboard(&csv_path, &chart_dir, &charts))
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))??;

    tracing::debug!(
        user_id = user.user_id,
        fraud = stats.fraud_count,
        legal = stats.legal_count,
        "Dashboard served"
    );

    Ok(Json(DashboardView {
        stats,
        charts: ChartUrls::new(),
    }))
}
