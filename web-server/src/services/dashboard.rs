//! Dashboard statistics

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use super::charts::{ChartCounts, ChartError, ChartRenderer};
use super::dataset::{self, class_counts, value_counts, DashboardRecord, DatasetError, LabeledTransaction};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// Aggregates shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub fraud_count: i64,
    pub legal_count: i64,
    pub fraud_percent: f64,
    pub legal_percent: f64,
    pub country_labels: Vec<String>,
    pub country_values: Vec<i64>,
    pub browser_labels: Vec<String>,
    pub browser_values: Vec<i64>,
    pub signup_hour_labels: Vec<String>,
    pub signup_hour_values: Vec<i64>,
}

/// Compute every dashboard aggregate over `records`
pub fn aggregate(records: &[DashboardRecord]) -> Result<DashboardStats, DatasetError> {
    let (fraud_count, legal_count) = class_counts(records);
    let fraud = || records.iter().filter(|r| r.is_fraud());

    let (country_labels, country_values) = value_counts(fraud().map(|r| r.country_name()))
        .into_iter()
        .take(5)
        .unzip();

    let (browser_labels, browser_values) = value_counts(fraud().map(|r| r.browser()))
        .into_iter()
        .unzip();

    let mut by_hour: BTreeMap<u32, i64> = BTreeMap::new();
    for record in records {
        // Every timestamp must parse, fraud or not
        let hour = record.signup_hour()?;
        if record.is_fraud() {
            *by_hour.entry(hour).or_default() += 1;
        }
    }
    let (signup_hour_labels, signup_hour_values) = by_hour
        .into_iter()
        .map(|(hour, count)| (hour.to_string(), count))
        .unzip();

    let total = fraud_count + legal_count;

    Ok(DashboardStats {
        fraud_count,
        legal_count,
        fraud_percent: percent(fraud_count, total),
        legal_percent: percent(legal_count, total),
        country_labels,
        country_values,
        browser_labels,
        browser_values,
        signup_hour_labels,
        signup_hour_values,
    })
}

/// Load the source CSV, redraw the charts, and aggregate.
///
/// The charts keep their own fraud/legal tally. It is compared against the
/// aggregate rather than shared, and a disagreement is logged.
pub fn build_dashboard(
    csv_path: &Path,
    chart_dir: &Path,
    charts: &ChartRenderer,
) -> Result<DashboardStats, DashboardError> {
    let records: Vec<DashboardRecord> = dataset::read_records(csv_path)?;
    let chart_counts = charts.render_dashboard_charts(&records, chart_dir)?;
    let stats = aggregate(&records)?;

    let aggregate_counts = ChartCounts {
        fraud: stats.fraud_count,
        legal: stats.legal_count,
    };
    if chart_counts != aggregate_counts {
        tracing::warn!(
            chart = ?chart_counts,
            aggregate = ?aggregate_counts,
            "Chart and dashboard fraud counts disagree"
        );
    }

    tracing::debug!(rows = records.len(), fraud = stats.fraud_count, "Dashboard aggregated");
    Ok(stats)
}

/// Share of `part` in `total` as a percentage with two decimals
fn percent(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
