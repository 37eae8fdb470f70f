//! Classifier adapter - ONNX Runtime integration
//!
//! Loads the trained binary-classification artifact once at startup and
//! exposes a probability-of-malicious score for an ordered feature vector.
//! The artifact is read-only after load; inference runs are serialized
//! behind a lock because the runtime session requires exclusive access.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::Deserialize;

/// Feature order the shipped Aegis model was trained with, used when the
/// artifact has no metadata sidecar.
const DEFAULT_FEATURE_ORDER: [&str; 6] = [
    "duration",
    "orig_bytes",
    "resp_bytes",
    "orig_pkts",
    "resp_pkts",
    "conn_state",
];

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("model artifact not found: {0}")]
    ArtifactMissing(String),
    #[error("onnx runtime error: {0}")]
    Runtime(String),
    #[error("model output is not a usable probability tensor")]
    BadOutput,
}

/// Seam between the detection engine and whatever produces probabilities.
/// Lets the decision rule be exercised without an ONNX artifact on disk.
pub trait Classifier: Send + Sync {
    /// Ordered feature names the model expects.
    fn feature_order(&self) -> &[String];

    /// Probability of the malicious class for one feature vector.
    fn probability_of_malicious(&self, features: &[f32]) -> Result<f64, ClassifierError>;

    /// Threshold override trained into the artifact, if any.
    fn trained_threshold(&self) -> Option<f64> {
        None
    }
}

/// Optional `<artifact>.json` sidecar written at training time.
#[derive(Debug, Default, Deserialize)]
struct SidecarMetadata {
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(default)]
    threshold: Option<f64>,
}

/// The production classifier: one ONNX session plus the exact feature
/// order it was trained with.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Mutex<Session>,
    feature_order: Vec<String>,
    threshold: Option<f64>,
}

impl OnnxClassifier {
    /// Load the artifact and its optional sidecar metadata.
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ArtifactMissing(
                model_path.display().to_string(),
            ));
        }

        tracing::info!("loading classifier artifact: {}", model_path.display());

        let session = Session::builder()
            .map_err(|e| ClassifierError::Runtime(format!("session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::Runtime(format!("optimization level: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::Runtime(format!("load model: {e}")))?;

        let (feature_order, threshold) = load_sidecar(model_path);
        tracing::info!("classifier online ({} features)", feature_order.len());

        Ok(Self {
            session: Mutex::new(session),
            feature_order,
            threshold,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    fn trained_threshold(&self) -> Option<f64> {
        self.threshold
    }

    fn probability_of_malicious(&self, features: &[f32]) -> Result<f64, ClassifierError> {
        let input = Array2::<f32>::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| ClassifierError::Runtime(format!("input shape: {e}")))?;

        let mut session = self.session.lock();

        // Output name has to be cloned before run to avoid a borrow conflict.
        // Probability tensors sit on the last output for the exporters we
        // support (label comes first on two-output models).
        let output_name = session
            .outputs()
            .last()
            .map(|o| o.name().to_owned())
            .ok_or(ClassifierError::BadOutput)?;

        let input_tensor = Value::from_array(input)
            .map_err(|e| ClassifierError::Runtime(format!("input tensor: {e}")))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ClassifierError::Runtime(format!("inference: {e}")))?;

        let output = outputs.get(&output_name).ok_or(ClassifierError::BadOutput)?;
        let extracted = output
            .try_extract_tensor::<f32>()
            .map_err(|_| ClassifierError::BadOutput)?;
        let data = extracted.1;

        // Two-class tensors carry the malicious class at index 1; a single
        // value is already the positive-class probability.
        let probability = match data.len() {
            0 => return Err(ClassifierError::BadOutput),
            1 => data[0],
            _ => data[1],
        };

        Ok(f64::from(probability.clamp(0.0, 1.0)))
    }
}

fn default_feature_order() -> Vec<String> {
    DEFAULT_FEATURE_ORDER.iter().map(|s| s.to_string()).collect()
}

/// Read the sidecar if present; fall back to the default Aegis layout.
fn load_sidecar(model_path: &Path) -> (Vec<String>, Option<f64>) {
    let sidecar = PathBuf::from(format!("{}.json", model_path.display()));

    let content = match std::fs::read_to_string(&sidecar) {
        Ok(content) => content,
        Err(_) => return (default_feature_order(), None),
    };

    match serde_json::from_str::<SidecarMetadata>(&content) {
        Ok(meta) => {
            tracing::info!("model metadata loaded from {}", sidecar.display());
            let order = if meta.feature_names.is_empty() {
                default_feature_order()
            } else {
                meta.feature_names
            };
            (order, meta.threshold)
        }
        Err(e) => {
            tracing::warn!("ignoring malformed model sidecar {}: {e}", sidecar.display());
            (default_feature_order(), None)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic classifier for exercising the engine and the ingress
    /// paths without an artifact on disk.
    pub struct FixedClassifier {
        outcome: Result<f64, ()>,
        features: Vec<String>,
    }

    impl FixedClassifier {
        pub fn new(probability: f64) -> Self {
            Self {
                outcome: Ok(probability),
                features: default_feature_order(),
            }
        }

        pub fn with_features(probability: f64, features: &[&str]) -> Self {
            Self {
                outcome: Ok(probability),
                features: features.iter().map(|s| s.to_string()).collect(),
            }
        }

        pub fn failing() -> Self {
            Self {
                outcome: Err(()),
                features: default_feature_order(),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn feature_order(&self) -> &[String] {
            &self.features
        }

        fn probability_of_malicious(&self, _features: &[f32]) -> Result<f64, ClassifierError> {
            self.outcome
                .map_err(|_| ClassifierError::Runtime("stubbed failure".to_string()))
        }
    }
}
