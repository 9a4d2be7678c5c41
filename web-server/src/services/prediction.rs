//! Single-transaction fraud prediction

use serde::Serialize;
use uuid::Uuid;

use super::classifier::Classifier;
use super::dashboard::round2;
use crate::models::TransactionFeatures;

/// Result handed straight to the home view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionOutcome {
    /// 1 for fraud, 0 for legal
    pub prediction: u8,
    /// Fraud probability as a percentage, two decimals
    pub risk_score: f64,
    /// Short reference shown to the user; not checked for uniqueness
    pub transaction_id: String,
}

pub fn predict_transaction(classifier: &dyn Classifier, features: &TransactionFeatures) -> PredictionOutcome {
    let prediction = classifier.predict(features);
    let probability = classifier.predict_proba(features);

    PredictionOutcome {
        prediction,
        risk_score: round2(probability * 100.0),
        transaction_id: generate_transaction_id(),
    }
}

/// Eight hex characters from a random UUID
pub fn generate_transaction_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}
