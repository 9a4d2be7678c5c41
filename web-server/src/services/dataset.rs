//! Tabular transaction datasets
//!
//! Both the reference dataset bundled with the model and the dashboard's
//! source CSV are read through here. Header names are normalized before
//! deserialization so `Country Name ` and `country_name` map to the same
//! field.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;

use chrono::{NaiveDateTime, Timelike};
use csv::StringRecord;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FRAUD: i64 = 1;
pub const LEGAL: i64 = 0;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open dataset {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("unparseable signup_time {0:?}")]
    Timestamp(String),
}

/// Rows that carry a fraud label plus the columns the charts group by
pub trait LabeledTransaction {
    fn class(&self) -> i64;
    fn country_name(&self) -> &str;
    fn browser(&self) -> &str;

    fn is_fraud(&self) -> bool {
        self.class() == FRAUD
    }

    fn is_legal(&self) -> bool {
        self.class() == LEGAL
    }
}

/// Row of the dashboard source CSV
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardRecord {
    pub class: i64,
    pub country_name: String,
    pub browser: String,
    pub signup_time: String,
}

impl DashboardRecord {
    /// Hour of day (0-23) of the signup timestamp
    pub fn signup_hour(&self) -> Result<u32, DatasetError> {
        parse_timestamp(&self.signup_time)
            .map(|t| t.hour())
            .ok_or_else(|| DatasetError::Timestamp(self.signup_time.clone()))
    }
}

impl LabeledTransaction for DashboardRecord {
    fn class(&self) -> i64 {
        self.class
    }

    fn country_name(&self) -> &str {
        &self.country_name
    }

    fn browser(&self) -> &str {
        &self.browser
    }
}

/// Row of the reference dataset shipped alongside the classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceRecord {
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
    pub class: i64,
}

impl LabeledTransaction for ReferenceRecord {
    fn class(&self) -> i64 {
        self.class
    }

    fn country_name(&self) -> &str {
        &self.country_name
    }

    fn browser(&self) -> &str {
        &self.browser
    }
}

/// Choices offered by the prediction form
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormOptions {
    pub sources: Vec<String>,
    pub browsers: Vec<String>,
    pub sexs: Vec<String>,
    pub country_names: Vec<String>,
    pub signup_day_names: Vec<String>,
    pub purchase_day_names: Vec<String>,
}

/// Reference dataset, loaded once at startup
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    records: Vec<ReferenceRecord>,
    options: FormOptions,
}

impl ReferenceDataset {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let records: Vec<ReferenceRecord> = read_records(path)?;

        tracing::info!(
            path = %path.display(),
            rows = records.len(),
            "Reference dataset loaded"
        );

        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<ReferenceRecord>) -> Self {
        let options = FormOptions {
            sources: distinct(&records, |r| &r.source),
            browsers: distinct(&records, |r| &r.browser),
            sexs: distinct(&records, |r| &r.sex),
            country_names: distinct(&records, |r| &r.country_name),
            signup_day_names: distinct(&records, |r| &r.signup_day_name),
            purchase_day_names: distinct(&records, |r| &r.purchase_day_name),
        };

        Self { records, options }
    }

    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }
}

/// Sorted unique values of one column
fn distinct<F>(records: &[ReferenceRecord], column: F) -> Vec<String>
where
    F: Fn(&ReferenceRecord) -> &String,
{
    records
        .iter()
        .map(column)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

/// Trim, lowercase, and replace spaces with underscores
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Read every row of a CSV file into `T`, matching columns by normalized name
pub fn read_records<T, P>(path: P) -> Result<Vec<T>, DatasetError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let mut reader = csv::Reader::from_reader(file);
    let headers: StringRecord = reader.headers()?.iter().map(normalize_header).collect();
    reader.set_headers(headers);

    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;

    Ok(records)
}

/// Parse the timestamp layouts pandas would accept for `signup_time`
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M",
    ];

    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Occurrence count of each value, most frequent first, ties by value
pub fn value_counts<'a, I>(values: I) -> Vec<(String, i64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut counts: Vec<(String, i64)> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Fraud and legal row counts
pub fn class_counts<T: LabeledTransaction>(records: &[T]) -> (i64, i64) {
    records.iter().fold((0, 0), |(fraud, legal), r| {
        (fraud + i64::from(r.is_fraud()), legal + i64::from(r.is_legal()))
    })
}
