// Risk fusion and the end-to-end scoring engine
pub mod engine;
pub mod risk_fusion;

pub use engine::{RiskEngine, high_risk};
pub use risk_fusion::{FusionInputs, RiskFusionEngine};
