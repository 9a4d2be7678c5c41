//! Shared fixtures for unit and HTTP tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::config::Config;
use crate::models::TransactionFeatures;
use crate::services::charts::ChartRenderer;
use crate::services::{LogisticClassifier, ReferenceDataset};
use crate::{create_router, db, AppState};

/// Dashboard source rows: 9 fraud, 4 legal, Japan leads the fraud countries
pub const DASHBOARD_CSV: &str = "\
user_id,signup_time,purchase_time,purchase_value,device_id,source,browser,sex,age,ip_address,class,country_name
22058,2015-02-24 22:55:49,2015-04-18 02:47:11,34,QVPSPJUOCKZAR,SEO,Chrome,M,39,732758368.8,1,Japan
333320,2015-03-01 22:10:00,2015-03-01 22:10:01,16,EOGFQPIZPYXFZ,Ads,Safari,F,53,350311387.9,1,Japan
1359,2015-01-10 03:00:00,2015-01-10 03:00:01,15,YSSKYOSJHPPLJ,SEO,Chrome,M,53,2621473820,1,Japan
150084,2015-04-01 03:30:00,2015-05-04 13:54:50,44,ATGTXKYKUDUQN,SEO,Chrome,M,41,3840542444,1,United States
221365,2015-05-02 14:00:00,2015-06-09 03:19:31,39,NAUITBZFJKHWW,Ads,FireFox,M,45,415583117.5,1,United States
159135,2015-06-03 14:20:00,2015-07-09 20:48:28,42,ALEYXFXINSXLZ,Ads,IE,M,18,2809315200,1,Brazil
50116,2015-07-04 09:00:00,2015-08-10 14:55:43,11,IWKVZHJOCLPUR,Ads,Chrome,F,19,3987484329,1,China
360585,2015-08-05 22:00:00,2015-09-04 12:33:21,27,HPUCUYLMJBYFW,Ads,Safari,M,34,1692458728,1,Korea Republic of
159045,2015-09-09 09:15:00,2015-09-26 21:32:16,62,ILXYDOZIHOOHT,SEO,Opera,F,33,3719094257,1,Mexico
182338,2015-01-01 10:00:00,2015-01-27 11:41:16,18,NRFFPPHZYFUVC,Ads,Chrome,M,35,341674739.6,0,France
199700,2015-01-02 11:00:00,2015-03-05 22:32:59,12,TEPSJVVXGNTYR,Ads,IE,F,33,1819008578,0,Japan
73884,2015-01-03 12:00:00,2015-05-26 03:54:21,26,QZNVQTUITFTHH,Direct,Safari,M,33,4038284553,0,Germany
79203,2015-01-04 13:00:00,2015-01-04 13:00:01,53,RWWINIUWIGACY,SEO,Chrome,M,33,4161540927,0,United States
";

const REFERENCE_CSV: &str = "\
source,browser,sex,age,country_name,n_device_occur,signup_month,signup_day,signup_day_name,purchase_month,purchase_day,purchase_day_name,purchase_over_time,class
SEO,Chrome,M,39,Japan,1,2,24,Tuesday,4,18,Saturday,1251.86,0
Ads,Chrome,F,53,United States,1,6,7,Sunday,6,8,Monday,4.98,0
SEO,Opera,F,53,United States,12,1,1,Thursday,1,1,Thursday,0.0,1
Ads,Safari,M,41,Brazil,1,4,28,Tuesday,5,4,Monday,492.02,0
Direct,IE,M,45,China,3,7,21,Tuesday,9,9,Wednesday,1194.02,1
";

pub fn sample_form() -> HashMap<String, String> {
    [
        ("source", "Direct"),
        ("browser", "Chrome"),
        ("sex", "M"),
        ("age", "150"),
        ("country_name", "United States"),
        ("n_device_occur", "1"),
        ("signup_month", "1"),
        ("signup_day", "1"),
        ("signup_day_name", "Monday"),
        ("purchase_month", "1"),
        ("purchase_day", "1"),
        ("purchase_day_name", "Monday"),
        ("purchase_over_time", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn sample_features() -> TransactionFeatures {
    TransactionFeatures {
        source: "SEO".to_string(),
        browser: "Chrome".to_string(),
        sex: "F".to_string(),
        age: 33,
        country_name: "Japan".to_string(),
        n_device_occur: 2,
        signup_month: 3,
        signup_day: 14,
        signup_day_name: "Saturday".to_string(),
        purchase_month: 4,
        purchase_day: 2,
        purchase_day_name: "Thursday".to_string(),
        purchase_over_time: 1530.5,
    }
}

/// A valid logistic model artifact covering every column
pub fn sample_model_json() -> String {
    json!({
        "name": "fraud-logreg-test",
        "features": crate::models::FEATURE_COLUMNS,
        "intercept": -2.1,
        "threshold": 0.5,
        "numeric": {
            "age": { "mean": 33.1, "scale": 8.6, "weight": 0.04 },
            "n_device_occur": { "mean": 1.7, "scale": 2.6, "weight": 1.35 },
            "signup_month": { "mean": 4.1, "scale": 2.0, "weight": -0.12 },
            "signup_day": { "mean": 15.7, "scale": 8.7, "weight": 0.01 },
            "purchase_month": { "mean": 5.8, "scale": 2.1, "weight": -0.2 },
            "purchase_day": { "mean": 15.8, "scale": 8.8, "weight": 0.02 },
            "purchase_over_time": { "mean": 1366.0, "scale": 1098.0, "weight": -1.9 }
        },
        "categorical": {
            "source": { "Ads": 0.05, "Direct": 0.11, "SEO": -0.02 },
            "browser": { "Chrome": 0.08, "FireFox": 0.02, "IE": -0.07, "Opera": 0.01, "Safari": -0.03 },
            "sex": { "F": -0.04, "M": 0.04 },
            "country_name": { "United States": 0.03, "Japan": -0.01, "China": 0.02 },
            "signup_day_name": { "Monday": 0.02, "Saturday": -0.01 },
            "purchase_day_name": { "Monday": 0.01, "Thursday": 0.0 }
        }
    })
    .to_string()
}

pub fn write_dashboard_csv(dir: &Path) -> PathBuf {
    let path = dir.join("fraud_data_de.csv");
    std::fs::write(&path, DASHBOARD_CSV).unwrap();
    path
}

pub fn write_reference_csv(dir: &Path) -> PathBuf {
    let path = dir.join("raw_data.csv");
    std::fs::write(&path, REFERENCE_CSV).unwrap();
    path
}

/// Configuration rooted in a test directory
pub fn test_config(dir: &Path) -> Config {
    Config {
        database_url: format!("sqlite://{}", dir.join("fraud_guard.db").display()),
        database_max_connections: 1,
        port: 0,
        session_secret: "test-session-secret".to_string(),
        session_expiration_hours: 1,
        model_path: dir.join("model.json"),
        reference_data_path: dir.join("raw_data.csv"),
        dashboard_data_path: dir.join("fraud_data_de.csv"),
        static_dir: dir.join("static"),
        chart_font_path: None,
        log_json: false,
        environment: "test".to_string(),
    }
}

/// Fresh migrated database in its own directory
pub async fn test_pool() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    (dir, pool)
}

pub async fn count_users(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Full application over temporary files
pub async fn test_app() -> (TempDir, AppState, Router) {
    let (dir, pool) = test_pool().await;
    let config = test_config(dir.path());

    std::fs::write(&config.model_path, sample_model_json()).unwrap();
    write_reference_csv(dir.path());
    write_dashboard_csv(dir.path());

    let state = AppState {
        pool,
        classifier: Arc::new(LogisticClassifier::load(&config.model_path).unwrap()),
        reference: Arc::new(ReferenceDataset::load(&config.reference_data_path).unwrap()),
        charts: ChartRenderer::new(config.chart_font_path.as_deref()),
        config,
    };

    let app = create_router(state.clone());
    (dir, state, app)
}
