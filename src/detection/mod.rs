//! Detection - classifier adapter and decision rule

pub mod classifier;
pub mod engine;

pub use classifier::{Classifier, ClassifierError, OnnxClassifier};
pub use engine::{DetectionEngine, DetectionError, DEFAULT_THRESHOLD};
