//! Prediction form handlers

use std::collections::HashMap;

use axum::{extract::{rejection::FormRejection, State}, Form, Json};
use serde::Serialize;

use crate::middleware::auth::UserContext;
use crate::models::TransactionFeatures;
use crate::services::dataset::FormOptions;
use crate::services::prediction::{predict_transaction, PredictionOutcome};
use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub username: String,
    pub options: FormOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionOutcome>,
}

impl HomeView {
    fn new(state: &AppState, user: UserContext, prediction: Option<PredictionOutcome>) -> Self {
        Self {
            username: user.username,
            options: state.reference.options().clone(),
            prediction,
        }
    }
}

/// Prediction form with the reference dataset's choices
pub async fn index(State(state): State<AppState>, user: UserContext) -> Json<HomeView> {
    Json(HomeView::new(&state, user, None))
}

/// Classify one submitted transaction
pub async fn predict(
    State(state): State<AppState>,
    user: UserContext,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> AppResult<Json<HomeView>> {
    let Form(form) = form?;
    let features = TransactionFeatures::from_form(&form)?;
    let outcome = predict_transaction(state.classifier.as_ref(), &features);

    tracing::info!(
        user_id = user.user_id,
        transaction_id = %outcome.transaction_id,
        prediction = outcome.prediction,
        risk_score = outcome.risk_score,
        model = state.classifier.name(),
        "Transaction scored"
    );

    Ok(Json(HomeView::new(&state, user, Some(outcome))))
}
