//! Configuration module

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum pooled database connections
    pub database_max_connections: u32,

    /// Server port
    pub port: u16,

    /// Secret used to sign session tokens
    pub session_secret: String,

    /// Session lifetime in hours
    pub session_expiration_hours: u64,

    /// Serialized classifier artifact
    pub model_path: PathBuf,

    /// Reference dataset shipped with the classifier
    pub reference_data_path: PathBuf,

    /// Source CSV for the dashboard, re-read on every visit
    pub dashboard_data_path: PathBuf,

    /// Public asset directory served under `/static`
    pub static_dir: PathBuf,

    /// TTF/OTF font for chart captions and axis labels
    pub chart_font_path: Option<PathBuf>,

    /// Emit JSON log lines instead of the pretty formatter
    pub log_json: bool,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://fraud_guard.db".to_string()),

            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(5),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| "fraudguard-dev-session-secret-change-in-production".to_string()),

            session_expiration_hours: env::var("SESSION_EXPIRATION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| "model/model.json".to_string())
                .into(),

            reference_data_path: env::var("REFERENCE_DATA_PATH")
                .unwrap_or_else(|_| "model/raw_data.csv".to_string())
                .into(),

            dashboard_data_path: env::var("DASHBOARD_DATA_PATH")
                .unwrap_or_else(|_| "data/fraud_data_de.csv".to_string())
                .into(),

            static_dir: env::var("STATIC_DIR")
                .unwrap_or_else(|_| "static".to_string())
                .into(),

            chart_font_path: env::var("CHART_FONT").ok().map(PathBuf::from),

            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Directory the dashboard charts are written to
    pub fn chart_dir(&self) -> PathBuf {
        self.static_dir.join("images")
    }
}
