//! Transaction feature vector

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column order of the classifier's training schema
pub const FEATURE_COLUMNS: [&str; 13] = [
    "source",
    "browser",
    "sex",
    "age",
    "country_name",
    "n_device_occur",
    "signup_month",
    "signup_day",
    "signup_day_name",
    "purchase_month",
    "purchase_day",
    "purchase_day_name",
    "purchase_over_time",
];

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Missing form field: {0}")]
    Missing(&'static str),

    #[error("invalid literal for integer field '{field}': {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("could not convert field '{field}' to float: {value:?}")]
    InvalidFloat { field: &'static str, value: String },
}

/// One transaction as submitted on the prediction form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFeatures {
    pub source: String,
    pub browser: String,
    pub sex: String,
    pub age: i64,
    pub country_name: String,
    pub n_device_occur: i64,
    pub signup_month: i64,
    pub signup_day: i64,
    pub signup_day_name: String,
    pub purchase_month: i64,
    pub purchase_day: i64,
    pub purchase_day_name: String,
    pub purchase_over_time: f64,
}

/// A single cell of the feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue<'a> {
    Categorical(&'a str),
    Numeric(f64),
}

impl TransactionFeatures {
    /// Assemble the feature vector from raw form fields.
    ///
    /// Every column is required. Integer columns go through `i64` parsing and
    /// `purchase_over_time` through `f64` and must be finite; surrounding
    /// whitespace is ignored.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, FeatureError> {
        let text = |field: &'static str| -> Result<String, FeatureError> {
            form.get(field).cloned().ok_or(FeatureError::Missing(field))
        };
        let integer = |field: &'static str| -> Result<i64, FeatureError> {
            let raw = text(field)?;
            raw.trim()
                .parse()
                .map_err(|_| FeatureError::InvalidInteger { field, value: raw })
        };
        // NaN and infinities parse as f64 but are not valid model input
        let float = |field: &'static str| -> Result<f64, FeatureError> {
            let raw = text(field)?;
            match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(FeatureError::InvalidFloat { field, value: raw }),
            }
        };

        Ok(Self {
            source: text("source")?,
            browser: text("browser")?,
            sex: text("sex")?,
            age: integer("age")?,
            country_name: text("country_name")?,
            n_device_occur: integer("n_device_occur")?,
            signup_month: integer("signup_month")?,
            signup_day: integer("signup_day")?,
            signup_day_name: text("signup_day_name")?,
            purchase_month: integer("purchase_month")?,
            purchase_day: integer("purchase_day")?,
            purchase_day_name: text("purchase_day_name")?,
            purchase_over_time: float("purchase_over_time")?,
        })
    }

    /// The row in `FEATURE_COLUMNS` order
    pub fn columns(&self) -> [(&'static str, FeatureValue<'_>); 13] {
        use FeatureValue::{Categorical, Numeric};

        [
            ("source", Categorical(&self.source)),
            ("browser", Categorical(&self.browser)),
            ("sex", Categorical(&self.sex)),
            ("age", Numeric(self.age as f64)),
            ("country_name", Categorical(&self.country_name)),
            ("n_device_occur", Numeric(self.n_device_occur as f64)),
            ("signup_month", Numeric(self.signup_month as f64)),
            ("signup_day", Numeric(self.signup_day as f64)),
            ("signup_day_name", Categorical(&self.signup_day_name)),
            ("purchase_month", Numeric(self.purchase_month as f64)),
            ("purchase_day", Numeric(self.purchase_day as f64)),
            ("purchase_day_name", Categorical(&self.purchase_day_name)),
            ("purchase_over_time", Numeric(self.purchase_over_time)),
        ]
    }

    /// Whether a column holds categorical values
    pub fn is_categorical(column: &str) -> bool {
        matches!(
            column,
            "source" | "browser" | "sex" | "country_name" | "signup_day_name" | "purchase_day_name"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_form;

    #[test]
    fn test_from_form() {
        let features = TransactionFeatures::from_form(&sample_form()).unwrap();
        assert_eq!(features.age, 150);
        assert_eq!(features.country_name, "United States");
        assert_eq!(features.purchase_over_time, 0.0);
    }

    #[test]
    fn test_columns_follow_training_order() {
        let features = TransactionFeatures::from_form(&sample_form()).unwrap();
        let names: Vec<&str> = features.columns().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, FEATURE_COLUMNS);

        for (name, value) in features.columns() {
            let categorical = matches!(value, FeatureValue::Categorical(_));
            assert_eq!(categorical, TransactionFeatures::is_categorical(name), "{name}");
        }
    }

    #[test]
    fn test_missing_field() {
        let mut form = sample_form();
        form.remove("browser");
        let err = TransactionFeatures::from_form(&form).unwrap_err();
        assert!(matches!(err, FeatureError::Missing("browser")));
    }

    #[test]
    fn test_malformed_numbers() {
        let mut form = sample_form();
        form.insert("age".to_string(), "forty".to_string());
        let err = TransactionFeatures::from_form(&form).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidInteger { field: "age", .. }));

        let mut form = sample_form();
        form.insert("signup_day".to_string(), "2.5".to_string());
        assert!(TransactionFeatures::from_form(&form).is_err());

        let mut form = sample_form();
        form.insert("purchase_over_time".to_string(), "".to_string());
        let err = TransactionFeatures::from_form(&form).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidFloat { field: "purchase_over_time", .. }));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        for raw in ["NaN", "nan", "inf", "-inf", "infinity"] {
            let mut form = sample_form();
            form.insert("purchase_over_time".to_string(), raw.to_string());
            let err = TransactionFeatures::from_form(&form).unwrap_err();
            assert!(
                matches!(err, FeatureError::InvalidFloat { field: "purchase_over_time", .. }),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_whitespace_is_tolerated() {
        let mut form = sample_form();
        form.insert("age".to_string(), " 42 ".to_string());
        let features = TransactionFeatures::from_form(&form).unwrap();
        assert_eq!(features.age, 42);
    }
}
