//! Configuration module

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::history;
use crate::watcher;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Static submission key expected in `X-AEGIS-KEY`
    pub api_key: String,

    /// Credential for the forensic generator; absence disables it
    pub gemini_api_key: Option<String>,

    /// Classifier artifact location
    pub model_path: PathBuf,

    /// Drop directory polled by the ingestion watcher
    pub watch_dir: PathBuf,

    /// Durable audit log written by the submission endpoint
    pub audit_log_path: PathBuf,

    /// Delay between watcher poll cycles
    pub poll_interval: Duration,

    /// History ledger capacity
    pub history_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            api_key: env::var("AEGIS_API_KEY")
                .unwrap_or_else(|_| "Burn_Greek_Fire_Burn1088".to_string()),

            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),

            model_path: env::var("AEGIS_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/aegis_rf.onnx")),

            watch_dir: env::var("AEGIS_WATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/incoming_telemetry")),

            audit_log_path: env::var("AEGIS_AUDIT_LOG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/lab_captures.csv")),

            poll_interval: env::var("AEGIS_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(watcher::DEFAULT_POLL_INTERVAL),

            history_capacity: env::var("AEGIS_HISTORY_CAP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(history::DEFAULT_CAPACITY),
        }
    }
}
