//! Submission endpoint handler

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::auth::verify_submission_key;
use crate::detection::DetectionError;
use crate::models::{DetectionEvent, TelemetrySubmission, Verdict, SOURCE_REMOTE};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

/// Classify one submitted record.
///
/// Every authenticated submission lands in the durable audit log, benign or
/// malicious; only malicious outcomes reach the in-memory ledger and carry
/// a forensic brief back to the caller.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(submission): Json<TelemetrySubmission>,
) -> AppResult<Json<AnalyzeResponse>> {
    verify_submission_key(&headers, &state.config.api_key)?;

    let record = submission.into_record().map_err(AppError::ValidationError)?;

    let detection = state.engine.classify(&record).map_err(|e| match e {
        DetectionError::Unavailable => AppError::ClassifierUnavailable,
        other => AppError::InternalError(other.to_string()),
    })?;

    state
        .audit
        .append(&record, detection.verdict)
        .map_err(|e| AppError::InternalError(format!("audit log: {e}")))?;

    if detection.verdict.is_malicious() {
        tracing::warn!(
            "threat detected from {SOURCE_REMOTE} (p={:.4})",
            detection.probability
        );

        // The outbound analyst call completes before the ledger is touched,
        // so a dropped connection mid-call leaves no partial state behind.
        let report = state.reporter.explain(&record).await;
        state.ledger.record(DetectionEvent::new(
            SOURCE_REMOTE,
            detection,
            Some(report.clone()),
        ));

        return Ok(Json(AnalyzeResponse {
            verdict: detection.verdict,
            report: Some(report),
        }));
    }

    tracing::info!("nominal submission (p={:.4})", detection.probability);

    Ok(Json(AnalyzeResponse {
        verdict: detection.verdict,
        report: None,
    }))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::audit::AuditLog;
    use crate::auth::API_KEY_HEADER;
    use crate::config::Config;
    use crate::detection::classifier::testing::FixedClassifier;
    use crate::detection::DetectionEngine;
    use crate::forensics::ForensicReporter;
    use crate::history::HistoryLedger;

    const TEST_KEY: &str = "test-hive-key";

    fn state(engine: DetectionEngine, dir: &Path) -> AppState {
        AppState {
            config: Config {
                port: 0,
                api_key: TEST_KEY.to_string(),
                gemini_api_key: None,
                model_path: dir.join("model.onnx"),
                watch_dir: dir.join("incoming"),
                audit_log_path: dir.join("captures.csv"),
                poll_interval: Duration::from_secs(5),
                history_capacity: 20,
            },
            engine: Arc::new(engine),
            ledger: Arc::new(HistoryLedger::new(20)),
            audit: Arc::new(AuditLog::new(dir.join("captures.csv"))),
            reporter: Arc::new(ForensicReporter::new(None)),
        }
    }

    fn headers(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key.parse().unwrap());
        headers
    }

    fn burst_submission() -> TelemetrySubmission {
        serde_json::from_str(
            r#"{"duration": 10.0, "orig_bytes": 45000, "resp_bytes": 500,
                "orig_pkts": 300, "resp_pkts": 50, "conn_state": "SF"}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn wrong_key_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        let state = state(
            DetectionEngine::new(Arc::new(FixedClassifier::new(0.9))),
            dir.path(),
        );

        let result = submit(
            State(state.clone()),
            headers("wrong-key"),
            Json(burst_submission()),
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidApiKey)));
        assert!(state.ledger.is_empty());
        // Nothing was classified, so the audit log was never even created.
        assert!(!state.config.audit_log_path.exists());
    }

    #[tokio::test]
    async fn malicious_submission_returns_report_and_is_recorded() {
        let dir = TempDir::new().unwrap();
        let state = state(
            DetectionEngine::new(Arc::new(FixedClassifier::new(0.9))),
            dir.path(),
        );

        let Json(response) = submit(
            State(state.clone()),
            headers(TEST_KEY),
            Json(burst_submission()),
        )
        .await
        .unwrap();

        assert_eq!(response.verdict, Verdict::Malicious);
        assert!(!response.report.as_deref().unwrap().is_empty());

        let snapshot = state.ledger.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].source, "remote-host");

        let audit = std::fs::read_to_string(&state.config.audit_log_path).unwrap();
        assert!(audit.lines().nth(1).unwrap().ends_with(",MALICIOUS"));
    }

    #[tokio::test]
    async fn benign_submission_is_audited_but_not_retained() {
        let dir = TempDir::new().unwrap();
        let state = state(
            DetectionEngine::new(Arc::new(FixedClassifier::new(0.1))),
            dir.path(),
        );

        let Json(response) = submit(
            State(state.clone()),
            headers(TEST_KEY),
            Json(burst_submission()),
        )
        .await
        .unwrap();

        assert_eq!(response.verdict, Verdict::Benign);
        assert!(response.report.is_none());
        assert!(state.ledger.is_empty());

        let audit = std::fs::read_to_string(&state.config.audit_log_path).unwrap();
        assert!(audit.lines().nth(1).unwrap().ends_with(",BENIGN"));
    }

    #[tokio::test]
    async fn unavailable_classifier_rejects_the_request() {
        let dir = TempDir::new().unwrap();
        let state = state(DetectionEngine::unavailable(), dir.path());

        let result = submit(
            State(state.clone()),
            headers(TEST_KEY),
            Json(burst_submission()),
        )
        .await;

        assert!(matches!(result, Err(AppError::ClassifierUnavailable)));
        assert!(!state.config.audit_log_path.exists());
    }

    #[tokio::test]
    async fn invalid_duration_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let state = state(
            DetectionEngine::new(Arc::new(FixedClassifier::new(0.9))),
            dir.path(),
        );

        let submission: TelemetrySubmission = serde_json::from_str(
            r#"{"duration": -3.0, "orig_bytes": 1, "resp_bytes": 1}"#,
        )
        .unwrap();

        let result = submit(State(state), headers(TEST_KEY), Json(submission)).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
