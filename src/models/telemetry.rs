//! Canonical telemetry schema
//!
//! Every ingress path (watcher CSV rows, endpoint JSON payloads) is
//! normalized into `TelemetryRecord` before the detection engine sees it.

use serde::{Deserialize, Serialize};

/// Sentinel used when a source omits the connection state.
pub const DEFAULT_CONN_STATE: &str = "SF";

/// Sentinel used when a source omits the service field.
pub const DEFAULT_SERVICE: &str = "-";

/// A single observed network-connection summary.
///
/// Immutable once constructed. Packet counters default to 0 when the source
/// does not report them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub duration: f64,
    pub orig_bytes: u64,
    pub resp_bytes: u64,
    pub orig_pkts: u64,
    pub resp_pkts: u64,
    pub conn_state: String,
    pub service: String,
}

impl TelemetryRecord {
    /// Look up a named feature in the form the trained column order expects.
    /// Categorical fields come back already encoded; names the record cannot
    /// supply return `None` and are default-filled by the engine.
    pub fn feature(&self, name: &str) -> Option<f32> {
        match name {
            "duration" => Some(self.duration as f32),
            "orig_bytes" => Some(self.orig_bytes as f32),
            "resp_bytes" => Some(self.resp_bytes as f32),
            "orig_pkts" => Some(self.orig_pkts as f32),
            "resp_pkts" => Some(self.resp_pkts as f32),
            "conn_state" => Some(conn_state_code(&self.conn_state)),
            _ => None,
        }
    }
}

/// Numeric codes the classifier was trained with for `conn_state`.
/// Unknown states collapse to the reserved code 0.
pub fn conn_state_code(state: &str) -> f32 {
    match state {
        "SF" => 1.0,
        "S0" => 2.0,
        "REJ" => 3.0,
        "RSTR" => 4.0,
        "RSTO" => 5.0,
        "S1" => 6.0,
        _ => 0.0,
    }
}

/// Wire payload accepted by `POST /analyze`.
#[derive(Debug, Deserialize)]
pub struct TelemetrySubmission {
    pub duration: f64,
    pub orig_bytes: u64,
    pub resp_bytes: u64,
    #[serde(default)]
    pub orig_pkts: u64,
    #[serde(default)]
    pub resp_pkts: u64,
    #[serde(default = "default_conn_state")]
    pub conn_state: String,
    #[serde(default = "default_service")]
    pub service: String,
}

fn default_conn_state() -> String {
    DEFAULT_CONN_STATE.to_string()
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

impl TelemetrySubmission {
    /// Validate and freeze into the canonical record.
    pub fn into_record(self) -> Result<TelemetryRecord, String> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(format!(
                "duration must be a non-negative number, got {}",
                self.duration
            ));
        }

        Ok(TelemetryRecord {
            duration: self.duration,
            orig_bytes: self.orig_bytes,
            resp_bytes: self.resp_bytes,
            orig_pkts: self.orig_pkts,
            resp_pkts: self.resp_pkts,
            conn_state: self.conn_state,
            service: self.service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_fills_optional_fields() {
        let payload = r#"{"duration": 1.5, "orig_bytes": 100, "resp_bytes": 200}"#;
        let submission: TelemetrySubmission = serde_json::from_str(payload).unwrap();
        let record = submission.into_record().unwrap();

        assert_eq!(record.orig_pkts, 0);
        assert_eq!(record.resp_pkts, 0);
        assert_eq!(record.conn_state, "SF");
        assert_eq!(record.service, "-");
    }

    #[test]
    fn negative_duration_is_rejected() {
        let payload = r#"{"duration": -1.0, "orig_bytes": 0, "resp_bytes": 0}"#;
        let submission: TelemetrySubmission = serde_json::from_str(payload).unwrap();
        assert!(submission.into_record().is_err());
    }

    #[test]
    fn conn_state_codes_match_training() {
        assert_eq!(conn_state_code("SF"), 1.0);
        assert_eq!(conn_state_code("S0"), 2.0);
        assert_eq!(conn_state_code("REJ"), 3.0);
        assert_eq!(conn_state_code("RSTR"), 4.0);
        assert_eq!(conn_state_code("RSTO"), 5.0);
        assert_eq!(conn_state_code("S1"), 6.0);
        assert_eq!(conn_state_code("OTH"), 0.0);
    }

    #[test]
    fn unknown_feature_name_is_none() {
        let record = TelemetryRecord {
            duration: 1.0,
            orig_bytes: 10,
            resp_bytes: 20,
            orig_pkts: 3,
            resp_pkts: 4,
            conn_state: "SF".to_string(),
            service: "http".to_string(),
        };

        assert_eq!(record.feature("duration"), Some(1.0));
        assert_eq!(record.feature("conn_state"), Some(1.0));
        assert_eq!(record.feature("service"), None);
        assert_eq!(record.feature("no_such_column"), None);
    }
}
