use crate::domain::detection::ComponentOutcome;
use crate::domain::ml::feature_registry::FeatureVector;
use serde::Serialize;

/// Output of one outlier model evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MlPrediction {
    /// 0-100
    pub score: f64,
    /// Raw isolation indicator `s` in (0, 1]
    pub anomaly_indicator: f64,
    pub threshold: f64,
    pub is_anomaly: bool,
    /// Schema features absent from the input, scored at the training mean
    pub missing_features: Vec<String>,
    /// Input features unknown to the schema
    pub ignored_features: Vec<String>,
}

/// Interface for the trained anomaly model consumed by the risk engine
pub trait AnomalyPredictor: Send + Sync {
    /// Score one feature vector. Never fails: problems surface as `Unavailable`.
    fn predict(&self, features: &FeatureVector) -> ComponentOutcome<MlPrediction>;

    /// Reason the model cannot score at all, if any
    fn unavailable_reason(&self) -> Option<String>;

    /// Get model name/type
    fn name(&self) -> &str;
}
