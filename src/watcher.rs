//! Ingestion watcher - polling consumer of batch telemetry drops
//!
//! Scans a drop directory on a fixed interval for CSV batches, feeds every
//! row through the detection engine and removes each file after processing.
//!
//! Removal is unconditional: a file that fails to parse is still consumed
//! (at-most-once, no retry), so a malformed batch is lost past its log
//! line. That policy is inherited from the lab deployment and kept on
//! purpose; quarantining would change observable behavior.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::detection::DetectionEngine;
use crate::forensics::ForensicReporter;
use crate::history::HistoryLedger;
use crate::models::telemetry::{DEFAULT_CONN_STATE, DEFAULT_SERVICE};
use crate::models::{DetectionEvent, TelemetryRecord, SOURCE_WATCHER};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Columns a batch header must carry. Packet counters and service are
/// optional and default-filled per row.
const REQUIRED_COLUMNS: [&str; 4] = ["duration", "orig_bytes", "resp_bytes", "conn_state"];

#[derive(Debug, thiserror::Error)]
enum BatchError {
    #[error("{0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
struct BatchOutcome {
    rows: usize,
    flagged: usize,
    skipped: usize,
}

/// Long-lived polling consumer feeding the shared detection engine.
pub struct IngestionWatcher {
    engine: Arc<DetectionEngine>,
    reporter: Arc<ForensicReporter>,
    ledger: Arc<HistoryLedger>,
    watch_dir: PathBuf,
    poll_interval: Duration,
}

impl IngestionWatcher {
    pub fn new(
        engine: Arc<DetectionEngine>,
        reporter: Arc<ForensicReporter>,
        ledger: Arc<HistoryLedger>,
        watch_dir: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            reporter,
            ledger,
            watch_dir,
            poll_interval,
        }
    }

    /// Run until the shutdown channel flips to `true`. The stop signal is
    /// honored between poll cycles and between files; an in-flight file is
    /// allowed to finish.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("ingestion watcher online: {}", self.watch_dir.display());

        loop {
            self.scan_cycle(&shutdown).await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }

        tracing::info!("ingestion watcher stopped");
    }

    /// One pass over the drop directory, in filesystem enumeration order.
    async fn scan_cycle(&self, shutdown: &watch::Receiver<bool>) {
        let batches = match scan_for_batches(&self.watch_dir) {
            Ok(batches) => batches,
            Err(e) => {
                tracing::error!("cannot scan {}: {e}", self.watch_dir.display());
                return;
            }
        };

        for path in batches {
            if *shutdown.borrow() {
                return;
            }
            self.consume_batch(&path).await;
        }
    }

    /// Process one file, then remove it whatever happened.
    async fn consume_batch(&self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        tracing::info!("new batch detected: {name}");

        match self.process_batch(path).await {
            Ok(outcome) => tracing::info!(
                "batch {name} complete: {} rows, {} flagged, {} skipped",
                outcome.rows,
                outcome.flagged,
                outcome.skipped
            ),
            Err(e) => tracing::error!("error processing {name}: {e}"),
        }

        // At-most-once consume: the file goes away even after a failure.
        if let Err(e) = std::fs::remove_file(path) {
            tracing::error!("failed to remove {name}: {e}");
        }
    }

    async fn process_batch(&self, path: &Path) -> Result<BatchOutcome, BatchError> {
        let content = std::fs::read_to_string(path)?;
        let rows = parse_batch(&content)?;

        let mut outcome = BatchOutcome::default();

        for (line_no, parsed) in rows {
            let record = match parsed {
                Ok(record) => record,
                Err(e) => {
                    outcome.skipped += 1;
                    tracing::warn!("row {line_no}: {e}");
                    continue;
                }
            };

            outcome.rows += 1;

            match self.engine.classify(&record) {
                Ok(detection) if detection.verdict.is_malicious() => {
                    outcome.flagged += 1;
                    tracing::warn!(
                        "threat confirmed at row {line_no} (p={:.4})",
                        detection.probability
                    );

                    // The outbound call happens before the ledger is
                    // touched; no lock is held while waiting on it.
                    let report = self.reporter.explain(&record).await;
                    self.ledger
                        .record(DetectionEvent::new(SOURCE_WATCHER, detection, Some(report)));
                }
                Ok(_) => {}
                Err(e) => {
                    outcome.skipped += 1;
                    tracing::warn!("row {line_no}: classification failed: {e}");
                }
            }
        }

        Ok(outcome)
    }
}

fn scan_for_batches(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut batches = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |e| e == "csv") {
            batches.push(path);
        }
    }

    Ok(batches)
}

/// Header-indexed parse of a telemetry batch. Drops are plain unquoted
/// CSV, so splitting on commas is the whole grammar.
fn parse_batch(
    content: &str,
) -> Result<Vec<(usize, Result<TelemetryRecord, String>)>, BatchError> {
    let mut lines = content.lines().enumerate();

    let header = match lines.next() {
        Some((_, header)) => header,
        None => return Err(BatchError::Malformed("empty batch".to_string())),
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    for required in REQUIRED_COLUMNS {
        if !columns.contains(&required) {
            return Err(BatchError::Malformed(format!(
                "header is missing column {required}"
            )));
        }
    }

    let rows = lines
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| (line_no + 1, parse_row(&columns, line)))
        .collect();

    Ok(rows)
}

fn parse_row(columns: &[&str], line: &str) -> Result<TelemetryRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    let duration: f64 = field(columns, &fields, "duration")
        .ok_or("missing duration")?
        .parse()
        .map_err(|_| format!("bad duration in {line:?}"))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(format!("negative duration in {line:?}"));
    }

    let parse_count = |name: &str, required: bool| -> Result<u64, String> {
        match field(columns, &fields, name) {
            Some(value) => value.parse().map_err(|_| format!("bad {name} in {line:?}")),
            None if required => Err(format!("missing {name}")),
            None => Ok(0),
        }
    };

    Ok(TelemetryRecord {
        duration,
        orig_bytes: parse_count("orig_bytes", true)?,
        resp_bytes: parse_count("resp_bytes", true)?,
        orig_pkts: parse_count("orig_pkts", false)?,
        resp_pkts: parse_count("resp_pkts", false)?,
        conn_state: field(columns, &fields, "conn_state")
            .unwrap_or(DEFAULT_CONN_STATE)
            .to_string(),
        service: field(columns, &fields, "service")
            .unwrap_or(DEFAULT_SERVICE)
            .to_string(),
    })
}

/// Value of the named column in one row. Empty cells count as absent.
fn field<'a>(columns: &[&str], fields: &[&'a str], name: &str) -> Option<&'a str> {
    columns
        .iter()
        .position(|c| *c == name)
        .and_then(|i| fields.get(i))
        .copied()
        .filter(|v| !v.is_empty())
}
