//! Detection engine - the shared classification decision rule.
//!
//! Both ingress paths (watcher and endpoint) funnel every telemetry record
//! through `classify`. The engine itself has no side effects and is safe to
//! call concurrently.

use std::sync::Arc;

use crate::models::{Detection, TelemetryRecord, Verdict};

use super::classifier::{Classifier, ClassifierError};

/// Decision threshold: malicious iff probability >= this value.
///
/// Deliberately below the 0.5 midpoint. A missed attack costs more than a
/// false alarm, so the rule favors recall over precision.
pub const DEFAULT_THRESHOLD: f64 = 0.25;

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// No classifier was loaded at startup. Classification fails closed;
    /// callers decide whether to reject the request or skip the record.
    #[error("classifier unavailable")]
    Unavailable,
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Pure decision function: telemetry in, verdict out.
pub struct DetectionEngine {
    classifier: Option<Arc<dyn Classifier>>,
    threshold: f64,
}

impl DetectionEngine {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        let threshold = classifier.trained_threshold().unwrap_or(DEFAULT_THRESHOLD);
        Self {
            classifier: Some(classifier),
            threshold,
        }
    }

    /// Engine with no loaded model: every classification fails closed.
    pub fn unavailable() -> Self {
        Self {
            classifier: None,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify one record against the loaded model.
    pub fn classify(&self, record: &TelemetryRecord) -> Result<Detection, DetectionError> {
        let classifier = self.classifier.as_ref().ok_or(DetectionError::Unavailable)?;

        let features = build_feature_vector(record, classifier.feature_order());
        let probability = classifier.probability_of_malicious(&features)?;

        let verdict = if probability >= self.threshold {
            Verdict::Malicious
        } else {
            Verdict::Benign
        };

        Ok(Detection {
            verdict,
            probability,
        })
    }
}

/// Assemble the vector in the exact column order the model was trained
/// with. Fields the model does not expect are dropped; expected fields the
/// record cannot supply are filled with the 0 default.
fn build_feature_vector(record: &TelemetryRecord, order: &[String]) -> Vec<f32> {
    order
        .iter()
        .map(|name| record.feature(name).unwrap_or(0.0))
        .collect()
}
