//! Detection configuration parsing from environment variables.
//!
//! Every `RISKSCOPE_*` variable is optional and falls back to the
//! `DetectionConfig` default. Values that are present but unparsable are errors.

use crate::domain::config::DetectionConfig;
use crate::domain::risk::weights::ComponentWeights;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Detection tunables read from the environment
#[derive(Debug, Clone)]
pub struct DetectionEnvConfig {
    // Windows
    pub window_days: usize,
    pub lookback_bars: usize,

    // Detector thresholds
    pub volume_spike_threshold: f64,
    pub z_score_threshold: f64,
    pub rsi_period: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub momentum_period: usize,
    pub momentum_reversal_threshold: f64,

    // Fusion
    pub suspicious_threshold: u8,
    pub weight_volume: Decimal,
    pub weight_price: Decimal,
    pub weight_ml: Decimal,
    pub weight_social: Decimal,

    // Outlier model training
    pub contamination: f64,
    pub n_trees: usize,
    pub max_samples: usize,
    pub random_seed: u64,
}

impl DetectionEnvConfig {
    pub fn from_env() -> Result<Self> {
        let d = DetectionConfig::default();

        Ok(Self {
            window_days: parse("RISKSCOPE_WINDOW_DAYS", d.window_days)?,
            lookback_bars: parse("RISKSCOPE_LOOKBACK_BARS", d.lookback_bars)?,
            volume_spike_threshold: parse(
                "RISKSCOPE_VOLUME_SPIKE_THRESHOLD",
                d.volume_spike_threshold,
            )?,
            z_score_threshold: parse("RISKSCOPE_Z_SCORE_THRESHOLD", d.z_score_threshold)?,
            rsi_period: parse("RISKSCOPE_RSI_PERIOD", d.rsi_period)?,
            rsi_lower: parse("RISKSCOPE_RSI_LOWER", d.rsi_lower)?,
            rsi_upper: parse("RISKSCOPE_RSI_UPPER", d.rsi_upper)?,
            bollinger_period: parse("RISKSCOPE_BOLLINGER_PERIOD", d.bollinger_period)?,
            bollinger_std: parse("RISKSCOPE_BOLLINGER_STD", d.bollinger_std)?,
            momentum_period: parse("RISKSCOPE_MOMENTUM_PERIOD", d.momentum_period)?,
            momentum_reversal_threshold: parse(
                "RISKSCOPE_MOMENTUM_REVERSAL_THRESHOLD",
                d.momentum_reversal_threshold,
            )?,
            suspicious_threshold: parse("RISKSCOPE_SUSPICIOUS_THRESHOLD", d.suspicious_threshold)?,
            weight_volume: parse("RISKSCOPE_WEIGHT_VOLUME", d.weights.volume)?,
            weight_price: parse("RISKSCOPE_WEIGHT_PRICE", d.weights.price)?,
            weight_ml: parse("RISKSCOPE_WEIGHT_ML", d.weights.ml)?,
            weight_social: parse("RISKSCOPE_WEIGHT_SOCIAL", d.weights.social)?,
            contamination: parse("RISKSCOPE_CONTAMINATION", d.contamination)?,
            n_trees: parse("RISKSCOPE_N_TREES", d.n_trees)?,
            max_samples: parse("RISKSCOPE_MAX_SAMPLES", d.max_samples)?,
            random_seed: parse("RISKSCOPE_RANDOM_SEED", d.random_seed)?,
        })
    }

    /// Validated domain configuration.
    pub fn to_detection_config(&self) -> Result<DetectionConfig> {
        let config = DetectionConfig {
            window_days: self.window_days,
            lookback_bars: self.lookback_bars,
            volume_spike_threshold: self.volume_spike_threshold,
            z_score_threshold: self.z_score_threshold,
            rsi_period: self.rsi_period,
            rsi_lower: self.rsi_lower,
            rsi_upper: self.rsi_upper,
            bollinger_period: self.bollinger_period,
            bollinger_std: self.bollinger_std,
            momentum_period: self.momentum_period,
            momentum_reversal_threshold: self.momentum_reversal_threshold,
            suspicious_threshold: self.suspicious_threshold,
            weights: ComponentWeights {
                volume: self.weight_volume,
                price: self.weight_price,
                ml: self.weight_ml,
                social: self.weight_social,
            },
            contamination: self.contamination,
            n_trees: self.n_trees,
            max_samples: self.max_samples,
            random_seed: self.random_seed,
        };
        config
            .validate()
            .context("Invalid detection configuration")?;
        Ok(config)
    }
}

fn parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}
