use chrono::NaiveDate;
use thiserror::Error;

/// Errors related to malformed or insufficient price series input
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeriesError {
    #[error("Insufficient data for {ticker}: need at least {required} bars, got {available}")]
    InsufficientData {
        ticker: String,
        required: usize,
        available: usize,
    },

    #[error("Malformed bar #{index} for {ticker}: {reason}")]
    MalformedBar {
        ticker: String,
        index: usize,
        reason: String,
    },

    #[error("Non-monotonic dates for {ticker}: {previous} is not before {current}")]
    NonMonotonicDates {
        ticker: String,
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Errors raised while deriving the feature vector
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeatureError {
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("Feature column {feature} was not produced")]
    MissingColumn { feature: String },

    #[error("Feature {feature} is non-finite at bar #{index} after missing-value fill")]
    NonFinite { feature: String, index: usize },
}

/// Errors raised by the rule-based detectors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectionError {
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("Indicator {name} unavailable: {reason}")]
    Indicator { name: String, reason: String },
}

/// Errors related to the outlier model artifact and its lifecycle
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model artifact not found: {path}")]
    NotFound { path: String },

    #[error("Failed to access model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt model artifact: {reason}")]
    Corrupt { reason: String },

    #[error("Unsupported model schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("Model schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    #[error("Training failed: {reason}")]
    Training { reason: String },

    #[error("Invalid feature input: {reason}")]
    InvalidFeatures { reason: String },
}

/// Errors related to externally supplied signals
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SignalError {
    #[error("Social score for {source_name} must be within [0, 100], got {value}")]
    OutOfRange { source_name: String, value: f64 },
}
