//! Detection outcome types
//!
//! Immutable, timestamped events retained by the history ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source tag for records ingested by the directory watcher.
pub const SOURCE_WATCHER: &str = "local-watcher";

/// Source tag for records submitted over the network endpoint.
pub const SOURCE_REMOTE: &str = "remote-host";

/// Binary outcome of applying the decision threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Benign,
    Malicious,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Benign => "BENIGN",
            Verdict::Malicious => "MALICIOUS",
        }
    }

    pub fn is_malicious(&self) -> bool {
        matches!(self, Verdict::Malicious)
    }
}

/// A classification outcome together with the probability that produced it.
/// Never stored apart from its source record.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Detection {
    pub verdict: Verdict,
    pub probability: f64,
}

/// One retained detection. Created only for malicious verdicts; owned
/// exclusively by the history ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub verdict: Verdict,
    pub probability: f64,
    /// Forensic brief, or `None` when the reporter never ran.
    pub report: Option<String>,
}

impl DetectionEvent {
    pub fn new(source: &str, detection: Detection, report: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.to_string(),
            verdict: detection.verdict,
            probability: detection.probability,
            report,
        }
    }
}
