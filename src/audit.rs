//! Durable audit log for the submission endpoint.
//!
//! Append-only delimited file recording every authenticated submission,
//! benign or malicious. The in-memory ledger keeps malicious events only;
//! this file keeps both. Created with its header on first write.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;

use crate::models::{TelemetryRecord, Verdict};

const HEADER: &str = "timestamp,duration,orig_bytes,resp_bytes,orig_pkts,resp_pkts,service,verdict";

/// Append-only audit writer. Concurrent request handlers are serialized by
/// the lock around the open handle, so rows never interleave.
pub struct AuditLog {
    file: Mutex<Option<File>>,
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Mutex::new(None),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row for a classified submission.
    pub fn append(&self, record: &TelemetryRecord, verdict: Verdict) -> io::Result<()> {
        let mut guard = self.file.lock();

        if guard.is_none() {
            *guard = Some(self.open()?);
        }

        if let Some(file) = guard.as_mut() {
            // Rows must stay single-line; the service field is the only
            // free-form column.
            let service = record.service.replace([',', '\n', '\r'], "_");
            writeln!(
                file,
                "{},{},{},{},{},{},{},{}",
                Utc::now().format("%Y-%m-%d %H:%M:%S"),
                record.duration,
                record.orig_bytes,
                record.resp_bytes,
                record.orig_pkts,
                record.resp_pkts,
                service,
                verdict.as_str()
            )?;
            file.flush()?;
        }

        Ok(())
    }

    fn open(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let needs_header = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if needs_header {
            writeln!(file, "{HEADER}")?;
            tracing::info!("created audit log: {}", self.path.display());
        }

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record() -> TelemetryRecord {
        TelemetryRecord {
            duration: 10.0,
            orig_bytes: 45000,
            resp_bytes: 500,
            orig_pkts: 300,
            resp_pkts: 50,
            conn_state: "SF".to_string(),
            service: "http".to_string(),
        }
    }

    #[test]
    fn header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captures.csv");
        let log = AuditLog::new(path.clone());

        log.append(&sample_record(), Verdict::Benign).unwrap();
        log.append(&sample_record(), Verdict::Malicious).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].ends_with(",BENIGN"));
        assert!(lines[2].ends_with(",MALICIOUS"));
    }

    #[test]
    fn existing_file_is_appended_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captures.csv");

        {
            let log = AuditLog::new(path.clone());
            log.append(&sample_record(), Verdict::Benign).unwrap();
        }
        {
            let log = AuditLog::new(path.clone());
            log.append(&sample_record(), Verdict::Benign).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let headers = content.lines().filter(|l| *l == HEADER).count();
        assert_eq!(headers, 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn delimiters_in_service_are_neutralized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("captures.csv");
        let log = AuditLog::new(path.clone());

        let mut record = sample_record();
        record.service = "dns,evil".to_string();
        log.append(&record, Verdict::Benign).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert_eq!(row.split(',').count(), 8);
        assert!(row.contains("dns_evil"));
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("lab").join("captures.csv");
        let log = AuditLog::new(path.clone());

        log.append(&sample_record(), Verdict::Malicious).unwrap();
        assert!(path.exists());
    }
}
