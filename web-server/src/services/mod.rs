//! Prediction, dataset, and chart services

pub mod classifier;
pub mod dataset;
pub mod charts;
pub mod dashboard;
pub mod prediction;

pub use classifier::{Classifier, LogisticClassifier};
pub use dataset::ReferenceDataset;
