#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use riskscope::application::ml::predictor::{AnomalyPredictor, MlPrediction};
use riskscope::domain::detection::ComponentOutcome;
use riskscope::domain::market::{Bar, PriceSeries};
use riskscope::domain::ml::feature_registry::FeatureVector;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn bar(i: usize, close: f64, volume: f64) -> Bar {
    Bar::new(
        start_date() + Duration::days(i as i64),
        close,
        close * 1.005,
        close * 0.995,
        close,
        volume,
    )
}

/// Gentle oscillation around 100 with volume around 100k.
pub fn calm_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 100.0 + (i as f64 * 0.8).sin() * 0.6)
        .collect()
}

pub fn calm_series(ticker: &str, len: usize) -> PriceSeries {
    let bars = calm_closes(len)
        .into_iter()
        .enumerate()
        .map(|(i, close)| bar(i, close, 100_000.0 + (i % 4) as f64 * 2_000.0))
        .collect();
    PriceSeries::new(ticker, bars).unwrap()
}

/// Seeded random walk, for training sets with realistic spread.
pub fn random_walk(ticker: &str, len: usize, seed: u64) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut close = 50.0;
    let bars = (0..len)
        .map(|i| {
            close *= 1.0 + rng.random_range(-0.02..0.02);
            let volume = 80_000.0 * rng.random_range(0.6..1.4);
            let high = close * (1.0 + rng.random_range(0.0..0.015));
            let low = close * (1.0 - rng.random_range(0.0..0.015));
            Bar::new(
                start_date() + Duration::days(i as i64),
                close,
                high,
                low,
                close,
                volume,
            )
        })
        .collect();
    PriceSeries::new(ticker, bars).unwrap()
}

/// Calm history, then 20 bars of steady 1% gains and a final 25% jump on 10x volume.
pub fn pump_series(ticker: &str, len: usize) -> PriceSeries {
    let calm = calm_closes(len - 21);
    let mut closes = calm.clone();
    let mut close = *calm.last().unwrap();
    for _ in 0..20 {
        close *= 1.01;
        closes.push(close);
    }
    closes.push(close * 1.25);

    let bars = closes
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let volume = if i == len - 1 { 1_000_000.0 } else { 100_000.0 };
            bar(i, c, volume)
        })
        .collect();
    PriceSeries::new(ticker, bars).unwrap()
}

pub fn flat_series(ticker: &str, len: usize) -> PriceSeries {
    let bars = (0..len)
        .map(|i| {
            Bar::new(
                start_date() + Duration::days(i as i64),
                100.0,
                100.0,
                100.0,
                100.0,
                50_000.0,
            )
        })
        .collect();
    PriceSeries::new(ticker, bars).unwrap()
}

/// Predictor returning a fixed score, or unavailable when `score` is `None`.
pub struct FixedPredictor {
    pub score: Option<f64>,
}

impl AnomalyPredictor for FixedPredictor {
    fn predict(&self, _features: &FeatureVector) -> ComponentOutcome<MlPrediction> {
        match self.score {
            Some(score) => ComponentOutcome::Scored(MlPrediction {
                score,
                anomaly_indicator: 0.35 + score / 200.0,
                threshold: 0.6,
                is_anomaly: score >= 50.0,
                missing_features: Vec::new(),
                ignored_features: Vec::new(),
            }),
            None => ComponentOutcome::unavailable("fixed predictor disabled"),
        }
    }

    fn unavailable_reason(&self) -> Option<String> {
        match self.score {
            Some(_) => None,
            None => Some("fixed predictor disabled".to_string()),
        }
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
