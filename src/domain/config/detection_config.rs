//! Detection Configuration Domain Value Object
//!
//! `DetectionConfig` gathers every tunable of the scoring pipeline: feature
//! windows, detector thresholds, fusion weights and outlier model training
//! parameters. Defaults are the production values.

use crate::domain::risk::weights::ComponentWeights;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Error type for DetectionConfig validation
#[derive(Debug, Error, PartialEq)]
pub enum DetectionConfigError {
    #[error("Invalid period: {field} = {value}. Must be at least {min}")]
    InvalidPeriod {
        field: String,
        value: usize,
        min: usize,
    },

    #[error("Invalid threshold: {field} = {value}. Must be positive and finite")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid RSI bounds: lower {lower} must be below upper {upper}, both within [0, 100]")]
    InvalidRsiBounds { lower: f64, upper: f64 },

    #[error("Invalid contamination: {value}. Must be within (0, 0.5]")]
    InvalidContamination { value: f64 },

    #[error("Invalid weights: {reason}")]
    InvalidWeights { reason: String },
}

/// Scoring pipeline configuration.
///
/// # Invariants
///
/// - windows and periods are at least 2
/// - thresholds are positive and finite
/// - `rsi_lower < rsi_upper`, both in [0, 100]
/// - weights are non-negative and sum to exactly 100
/// - `contamination` in (0, 0.5]
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Trailing window for rolling statistics (bars)
    pub window_days: usize,
    /// Extra history needed before the first full-window feature row
    pub lookback_bars: usize,

    /// Volume/rolling-average ratio that marks a spike
    pub volume_spike_threshold: f64,

    pub z_score_threshold: f64,
    pub rsi_period: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub momentum_period: usize,

    /// 3-bar momentum swing (fraction) that counts as a reversal
    pub momentum_reversal_threshold: f64,

    /// Final score at or above which an assessment is suspicious
    pub suspicious_threshold: u8,
    pub weights: ComponentWeights,

    // Outlier model training
    pub contamination: f64,
    pub n_trees: usize,
    pub max_samples: usize,
    pub random_seed: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            lookback_bars: 26,
            volume_spike_threshold: 2.0,
            z_score_threshold: 2.0,
            rsi_period: 14,
            rsi_lower: 20.0,
            rsi_upper: 80.0,
            bollinger_period: 20,
            bollinger_std: 2.0,
            momentum_period: 10,
            momentum_reversal_threshold: 0.05,
            suspicious_threshold: 60,
            weights: ComponentWeights::default(),
            contamination: 0.10,
            n_trees: 100,
            max_samples: 256,
            random_seed: 42,
        }
    }
}

impl DetectionConfig {
    /// Minimum number of bars an input series must have.
    pub fn min_history(&self) -> usize {
        self.window_days + self.lookback_bars
    }

    pub fn validate(&self) -> Result<(), DetectionConfigError> {
        self.validate_period("window_days", self.window_days, 2)?;
        self.validate_period("rsi_period", self.rsi_period, 2)?;
        self.validate_period("bollinger_period", self.bollinger_period, 2)?;
        self.validate_period("momentum_period", self.momentum_period, 1)?;
        self.validate_period("n_trees", self.n_trees, 1)?;
        self.validate_period("max_samples", self.max_samples, 2)?;

        // Detectors read these many bars behind the latest one.
        let deepest = self
            .rsi_period
            .max(self.bollinger_period)
            .max(self.momentum_period)
            .max(self.window_days + 1);
        if self.min_history() < deepest {
            return Err(DetectionConfigError::InvalidPeriod {
                field: "lookback_bars".to_string(),
                value: self.lookback_bars,
                min: deepest - self.window_days,
            });
        }

        self.validate_threshold("volume_spike_threshold", self.volume_spike_threshold)?;
        self.validate_threshold("z_score_threshold", self.z_score_threshold)?;
        self.validate_threshold("bollinger_std", self.bollinger_std)?;
        self.validate_threshold("momentum_reversal_threshold", self.momentum_reversal_threshold)?;

        if !(0.0..=100.0).contains(&self.rsi_lower)
            || !(0.0..=100.0).contains(&self.rsi_upper)
            || self.rsi_lower >= self.rsi_upper
        {
            return Err(DetectionConfigError::InvalidRsiBounds {
                lower: self.rsi_lower,
                upper: self.rsi_upper,
            });
        }

        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(DetectionConfigError::InvalidContamination {
                value: self.contamination,
            });
        }

        if self.suspicious_threshold > 100 {
            return Err(DetectionConfigError::InvalidThreshold {
                field: "suspicious_threshold".to_string(),
                value: f64::from(self.suspicious_threshold),
            });
        }

        self.validate_weights()
    }

    fn validate_period(
        &self,
        field: &str,
        value: usize,
        min: usize,
    ) -> Result<(), DetectionConfigError> {
        if value < min {
            return Err(DetectionConfigError::InvalidPeriod {
                field: field.to_string(),
                value,
                min,
            });
        }
        Ok(())
    }

    fn validate_threshold(&self, field: &str, value: f64) -> Result<(), DetectionConfigError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(DetectionConfigError::InvalidThreshold {
                field: field.to_string(),
                value,
            });
        }
        Ok(())
    }

    fn validate_weights(&self) -> Result<(), DetectionConfigError> {
        let w = &self.weights;
        if [w.volume, w.price, w.ml, w.social]
            .iter()
            .any(|v| *v < Decimal::ZERO)
        {
            return Err(DetectionConfigError::InvalidWeights {
                reason: "weights must be non-negative".to_string(),
            });
        }
        if w.total() != dec!(100) {
            return Err(DetectionConfigError::InvalidWeights {
                reason: format!("weights sum to {}, expected 100", w.total()),
            });
        }
        Ok(())
    }
}
