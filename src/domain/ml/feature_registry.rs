use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered list of feature names.
/// This order is the schema persisted with every trained model.
/// Any change here is a breaking change for stored model artifacts.
pub const FEATURE_NAMES: &[&str] = &[
    // Volume-price divergence
    "volume_price_correlation",
    "volume_price_divergence",
    "volume_price_ratio",
    "volume_acceleration",
    "volume_price_accel_diff",
    "spike_without_follow_through",
    // Price acceleration
    "price_acceleration",
    "price_acceleration_rate",
    "price_accel_magnitude",
    "sudden_acceleration_zscore",
    "acceleration_reversal",
    // Intraday pattern
    "intraday_range_pct",
    "intraday_range_ratio",
    "close_position_in_range",
    "gap_pct",
    "gap_filled",
    // Multi-day momentum
    "momentum_3d",
    "momentum_5d",
    "momentum_change",
    "momentum_reversal",
    "momentum_consistency",
    "momentum_volume_ratio",
    // Liquidity
    "volume_to_price_ratio",
    "volume_price_ratio_vs_avg",
    "dollar_volume",
    "dollar_volume_ratio",
    "price_impact",
    "liquidity_score",
    // Price stability
    "price_volatility",
    "volatility_ratio",
    "price_oscillation",
    "price_stability_score",
    "hl_spread",
    "hl_spread_ratio",
    // Volume distribution
    "volume_trend",
    "volume_cv",
    "volume_spike_duration",
    "volume_mean_deviation",
    // Calendar
    "day_of_week",
    "is_weekend",
    "day_of_month",
    "is_month_end",
    "is_month_beginning",
    // Reversal pattern
    "reversal_pattern",
    "reversal_magnitude",
    "pump_dump_pattern",
    "reversal_likelihood",
];

pub const FEATURE_COUNT: usize = 47;

/// Position of `name` in the registry.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// Named feature values for one bar of one ticker.
///
/// Entries keep insertion order. Vectors built by the feature engineer follow
/// `FEATURE_NAMES`; vectors handed to the scorer from elsewhere may not, and the
/// scorer reorders them by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub ticker: String,
    pub date: NaiveDate,
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    /// Builds a vector in registry order. `values` must hold `FEATURE_COUNT` items.
    pub fn from_registry(ticker: impl Into<String>, date: NaiveDate, values: &[f64]) -> Self {
        debug_assert_eq!(values.len(), FEATURE_COUNT, "one value per registry feature");
        let entries = FEATURE_NAMES
            .iter()
            .zip(values.iter())
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        Self {
            ticker: ticker.into(),
            date,
            entries,
        }
    }

    pub fn from_entries(
        ticker: impl Into<String>,
        date: NaiveDate,
        entries: Vec<(String, f64)>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            entries,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.is_finite())
    }

    /// Drops the named entry. Mostly useful to simulate partial upstream input.
    pub fn without(mut self, name: &str) -> Self {
        self.entries.retain(|(n, _)| n != name);
        self
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_length() {
        assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_registry_names_unique() {
        let unique: HashSet<_> = FEATURE_NAMES.iter().collect();
        assert_eq!(unique.len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_feature_index_order() {
        assert_eq!(feature_index("volume_price_correlation"), Some(0));
        assert_eq!(feature_index("reversal_likelihood"), Some(46));
        assert_eq!(feature_index("rsi"), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "one value per registry feature")]
    fn test_short_value_slice_rejected() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        FeatureVector::from_registry("ACME", date, &[0.0; FEATURE_COUNT - 1]);
    }

    #[test]
    fn test_vector_from_registry() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let values: Vec<f64> = (0..FEATURE_COUNT).map(|i| i as f64).collect();
        let fv = FeatureVector::from_registry("ACME", date, &values);

        assert_eq!(fv.len(), FEATURE_COUNT);
        assert_eq!(fv.get("gap_pct"), Some(14.0));
        assert_eq!(fv.names(), FEATURE_NAMES.to_vec());
        assert!(fv.is_finite());
    }

    #[test]
    fn test_with_and_without() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let fv = FeatureVector::from_registry("ACME", date, &[0.0; FEATURE_COUNT])
            .without("gap_pct")
            .with("extra_signal", 3.0)
            .with("dollar_volume", f64::NAN);

        assert_eq!(fv.get("gap_pct"), None);
        assert_eq!(fv.get("extra_signal"), Some(3.0));
        assert!(!fv.is_finite());
    }
}
