// Startup wiring
pub mod bootstrap;

// Rule-based detectors
pub mod detectors;

// Feature extraction
pub mod feature_engineering_service;
pub mod market_data;

// Outlier model training and scoring
pub mod ml;

// Fusion and end-to-end scoring
pub mod risk_management;
