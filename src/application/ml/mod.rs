pub mod data_collector;
pub mod evaluation;
pub mod isolation_forest;
pub mod outlier_scorer;
pub mod predictor;

pub use isolation_forest::IsolationForestTrainer;
pub use outlier_scorer::OutlierScorer;
pub use predictor::{AnomalyPredictor, MlPrediction};
