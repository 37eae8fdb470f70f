//! Data model types

pub mod event;
pub mod telemetry;

pub use event::{Detection, DetectionEvent, Verdict, SOURCE_REMOTE, SOURCE_WATCHER};
pub use telemetry::{conn_state_code, TelemetryRecord, TelemetrySubmission};
