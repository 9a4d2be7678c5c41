//! Fraud classifier
//!
//! The trained model ships as a JSON artifact exported from the training
//! pipeline: per-column standardization and weights for numeric columns,
//! one-hot weights for categorical columns, and a logistic link on top.
//! Inference is deterministic and read-only, so a single loaded instance is
//! shared by every request.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{FeatureValue, TransactionFeatures, FEATURE_COLUMNS};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model feature order {found:?} does not match the expected schema")]
    SchemaMismatch { found: Vec<String> },

    #[error("model has no parameters for column '{0}'")]
    MissingColumn(&'static str),

    #[error("numeric column '{0}' has a zero scale")]
    ZeroScale(String),
}

/// Binary fraud classifier over a single transaction
pub trait Classifier: Send + Sync {
    /// Short identifier of the loaded artifact
    fn name(&self) -> &str;

    /// Predicted label: 1 for fraud, 0 for legal
    fn predict(&self, features: &TransactionFeatures) -> u8;

    /// Probability of the fraud class, in [0, 1]
    fn predict_proba(&self, features: &TransactionFeatures) -> f64;
}

/// Standardization and weight for one numeric column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericParams {
    pub mean: f64,
    pub scale: f64,
    pub weight: f64,
}

/// Serialized logistic model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub name: String,
    pub features: Vec<String>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub numeric: HashMap<String, NumericParams>,
    pub categorical: HashMap<String, HashMap<String, f64>>,
}

fn default_threshold() -> f64 {
    0.5
}

impl LogisticClassifier {
    /// Load and validate an artifact from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let model: Self = serde_json::from_reader(reader)?;
        model.validate()?;

        tracing::info!(
            model = %model.name,
            path = %path.display(),
            threshold = model.threshold,
            "Classifier loaded"
        );

        Ok(model)
    }

    /// Check the artifact against the feature schema
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.features.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
            return Err(ModelError::SchemaMismatch { found: self.features.clone() });
        }

        for column in FEATURE_COLUMNS {
            if TransactionFeatures::is_categorical(column) {
                if !self.categorical.contains_key(column) {
                    return Err(ModelError::MissingColumn(column));
                }
            } else {
                let params = self.numeric.get(column).ok_or(ModelError::MissingColumn(column))?;
                if params.scale == 0.0 {
                    return Err(ModelError::ZeroScale(column.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Linear score before the logistic link
    fn decision_function(&self, features: &TransactionFeatures) -> f64 {
        features
            .columns()
            .iter()
            .fold(self.intercept, |acc, (column, value)| {
                acc + match value {
                    FeatureValue::Numeric(x) => self
                        .numeric
                        .get(*column)
                        .map(|p| p.weight * (x - p.mean) / p.scale)
                        .unwrap_or(0.0),
                    // Categories unseen during training contribute nothing
                    FeatureValue::Categorical(category) => self
                        .categorical
                        .get(*column)
                        .and_then(|weights| weights.get(*category))
                        .copied()
                        .unwrap_or(0.0),
                }
            })
    }
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &TransactionFeatures) -> u8 {
        u8::from(self.predict_proba(features) >= self.threshold)
    }

    fn predict_proba(&self, features: &TransactionFeatures) -> f64 {
        sigmoid(self.decision_function(features))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
