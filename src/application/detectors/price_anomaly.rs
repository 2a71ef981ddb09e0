use crate::application::market_data::statistical_features::mean_std;
use crate::domain::config::DetectionConfig;
use crate::domain::detection::DetectorResult;
use crate::domain::errors::DetectionError;
use crate::domain::market::price_series::PriceSeries;
use serde::Serialize;
use ta::Next;
use ta::indicators::{BollingerBands, RelativeStrengthIndex};

const Z_WEIGHT: f64 = 0.40;
const BOLLINGER_WEIGHT: f64 = 0.25;
const RSI_WEIGHT: f64 = 0.20;
const MOMENTUM_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiStatus {
    ExtremelyOverbought,
    Overbought,
    Neutral,
    Oversold,
    ExtremelyOversold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandStatus {
    AboveUpper,
    Inside,
    BelowLower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumStatus {
    Extreme,
    VeryHigh,
    High,
    Moderate,
    Normal,
}

/// Raw indicator readings for the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceIndicators {
    /// Latest return in percent
    pub return_pct: f64,
    /// 0 when the window has zero variance
    pub z_score: f64,
    pub rsi: f64,
    pub rsi_status: RsiStatus,
    pub band_upper: f64,
    pub band_middle: f64,
    pub band_lower: f64,
    pub band_status: BandStatus,
    pub momentum_pct: f64,
    pub momentum_status: MomentumStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSubScores {
    pub z: f64,
    pub bollinger: f64,
    pub rsi: f64,
    pub momentum: f64,
}

impl PriceSubScores {
    pub fn combined(&self) -> f64 {
        (Z_WEIGHT * self.z
            + BOLLINGER_WEIGHT * self.bollinger
            + RSI_WEIGHT * self.rsi
            + MOMENTUM_WEIGHT * self.momentum)
            .min(100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceDetection {
    pub result: DetectorResult,
    pub indicators: PriceIndicators,
    pub sub_scores: PriceSubScores,
}

/// z bucket score plus a boost for large absolute returns.
pub fn z_score_points(z: f64, return_pct: f64) -> f64 {
    let base: f64 = match z.abs() {
        a if a >= 4.0 => 100.0,
        a if a >= 3.0 => 85.0,
        a if a >= 2.5 => 70.0,
        a if a >= 2.0 => 55.0,
        a if a >= 1.5 => 35.0,
        _ => 0.0,
    };
    let boost = match return_pct.abs() {
        r if r >= 20.0 => 20.0,
        r if r >= 15.0 => 15.0,
        r if r >= 10.0 => 10.0,
        _ => 0.0,
    };
    (base + boost).min(100.0)
}

pub fn momentum_points(momentum_pct: f64) -> (f64, MomentumStatus) {
    match momentum_pct.abs() {
        m if m >= 30.0 => (100.0, MomentumStatus::Extreme),
        m if m >= 20.0 => (85.0, MomentumStatus::VeryHigh),
        m if m >= 15.0 => (70.0, MomentumStatus::High),
        m if m >= 10.0 => (50.0, MomentumStatus::Moderate),
        _ => (0.0, MomentumStatus::Normal),
    }
}

/// Rule-based price detector combining return z-score, RSI, Bollinger Bands and momentum.
pub struct PriceAnomalyDetector {
    window_days: usize,
    z_score_threshold: f64,
    rsi_period: usize,
    rsi_lower: f64,
    rsi_upper: f64,
    bollinger_period: usize,
    bollinger_std: f64,
    momentum_period: usize,
}

impl PriceAnomalyDetector {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            window_days: config.window_days,
            z_score_threshold: config.z_score_threshold,
            rsi_period: config.rsi_period,
            rsi_lower: config.rsi_lower,
            rsi_upper: config.rsi_upper,
            bollinger_period: config.bollinger_period,
            bollinger_std: config.bollinger_std,
            momentum_period: config.momentum_period,
        }
    }

    fn required_bars(&self) -> usize {
        (self.window_days + 1)
            .max(self.rsi_period + 1)
            .max(self.bollinger_period)
            .max(self.momentum_period + 1)
    }

    pub fn detect(&self, series: &PriceSeries) -> Result<PriceDetection, DetectionError> {
        series.require(self.required_bars())?;
        let closes = series.closes();
        let n = closes.len();

        // Returns in percent over the trailing window, latest return included.
        let returns: Vec<f64> = closes[n - self.window_days - 1..]
            .windows(2)
            .map(|w| (w[1] - w[0]) / w[0] * 100.0)
            .collect();
        let return_pct = returns[returns.len() - 1];
        let z_score = match mean_std(&returns) {
            Some((mean, std)) if std > 1e-12 && std.is_finite() => (return_pct - mean) / std,
            _ => 0.0,
        };

        let (rsi, band_upper, band_middle, band_lower) = self.run_indicators(&closes)?;
        let close = closes[n - 1];

        let rsi_status = self.rsi_status(rsi);
        let rsi_points = match rsi_status {
            RsiStatus::ExtremelyOverbought | RsiStatus::ExtremelyOversold => 90.0,
            RsiStatus::Overbought | RsiStatus::Oversold => 70.0,
            RsiStatus::Neutral => 0.0,
        };

        let (band_status, band_points) = if close > band_upper {
            let deviation = (close - band_upper) / band_upper * 100.0;
            (BandStatus::AboveUpper, (70.0 + (deviation * 5.0).floor()).min(100.0))
        } else if close < band_lower {
            let deviation = (band_lower - close) / band_lower.abs().max(f64::EPSILON) * 100.0;
            (BandStatus::BelowLower, (70.0 + (deviation * 5.0).floor()).min(100.0))
        } else {
            (BandStatus::Inside, 0.0)
        };

        let base = closes[n - 1 - self.momentum_period];
        let momentum_pct = (close - base) / base * 100.0;
        let (momentum_pts, momentum_status) = momentum_points(momentum_pct);

        let sub_scores = PriceSubScores {
            z: z_score_points(z_score, return_pct),
            bollinger: band_points,
            rsi: rsi_points,
            momentum: momentum_pts,
        };
        let score = sub_scores.combined();

        let is_suspicious = z_score.abs() >= self.z_score_threshold
            || rsi > self.rsi_upper
            || rsi < self.rsi_lower
            || band_status != BandStatus::Inside;

        let indicators = PriceIndicators {
            return_pct,
            z_score,
            rsi,
            rsi_status,
            band_upper,
            band_middle,
            band_lower,
            band_status,
            momentum_pct,
            momentum_status,
        };

        let result = DetectorResult::new(is_suspicious, score, Self::message(&indicators, score))
            .with_number("z_score", z_score)
            .with_number("current_return_percent", return_pct)
            .with_number("current_price", close)
            .with_number("rsi", rsi)
            .with_detail("rsi_status", serde_json::to_value(rsi_status).unwrap_or_default())
            .with_number("upper_band", band_upper)
            .with_number("middle_band", band_middle)
            .with_number("lower_band", band_lower)
            .with_detail("band_status", serde_json::to_value(band_status).unwrap_or_default())
            .with_number("momentum_percent", momentum_pct)
            .with_detail(
                "momentum_status",
                serde_json::to_value(momentum_status).unwrap_or_default(),
            )
            .with_number("threshold_used", self.z_score_threshold);

        Ok(PriceDetection {
            result,
            indicators,
            sub_scores,
        })
    }

    fn run_indicators(&self, closes: &[f64]) -> Result<(f64, f64, f64, f64), DetectionError> {
        let mut rsi = RelativeStrengthIndex::new(self.rsi_period).map_err(|e| {
            DetectionError::Indicator {
                name: "rsi".to_string(),
                reason: format!("{:?}", e),
            }
        })?;
        let mut bands =
            BollingerBands::new(self.bollinger_period, self.bollinger_std).map_err(|e| {
                DetectionError::Indicator {
                    name: "bollinger_bands".to_string(),
                    reason: format!("{:?}", e),
                }
            })?;

        let mut last_rsi = 50.0;
        let mut last_band = None;
        for close in closes {
            last_rsi = rsi.next(*close);
            last_band = Some(bands.next(*close));
        }

        let band = last_band.ok_or_else(|| DetectionError::Indicator {
            name: "bollinger_bands".to_string(),
            reason: "no bars".to_string(),
        })?;
        if !last_rsi.is_finite() {
            last_rsi = 50.0;
        }
        Ok((last_rsi, band.upper, band.average, band.lower))
    }

    fn rsi_status(&self, rsi: f64) -> RsiStatus {
        match rsi {
            r if r >= self.rsi_upper => RsiStatus::ExtremelyOverbought,
            r if r <= self.rsi_lower => RsiStatus::ExtremelyOversold,
            r if r >= 70.0 => RsiStatus::Overbought,
            r if r <= 30.0 => RsiStatus::Oversold,
            _ => RsiStatus::Neutral,
        }
    }

    fn message(indicators: &PriceIndicators, score: f64) -> String {
        let direction = if indicators.return_pct > 0.0 {
            "increased"
        } else {
            "decreased"
        };
        let movement = format!(
            "Price {} {:.1}% (Z-score: {:.1})",
            direction,
            indicators.return_pct.abs(),
            indicators.z_score
        );
        match score {
            s if s >= 80.0 => format!("EXTREME PRICE ANOMALY: {}. High manipulation risk!", movement),
            s if s >= 60.0 => format!("HIGH PRICE ANOMALY: {}. Suspicious movement.", movement),
            s if s >= 40.0 => format!("MODERATE PRICE ANOMALY: {}. Monitor closely.", movement),
            _ => format!("NORMAL PRICE MOVEMENT: {}.", movement),
        }
    }
}
