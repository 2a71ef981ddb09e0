use crate::domain::config::DetectionConfig;
use crate::domain::detection::DetectorResult;
use crate::domain::errors::DetectionError;
use crate::domain::market::price_series::PriceSeries;
use tracing::debug;

/// Volume spike reading for the latest bar.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDetection {
    pub result: DetectorResult,
    /// current volume / rolling average, 0 when the average is 0
    pub ratio: f64,
    pub current_volume: f64,
    pub average_volume: f64,
}

/// Step mapping from volume ratio to a 0-100 score. Bounds are lower-inclusive.
pub fn volume_score(ratio: f64) -> f64 {
    match ratio {
        r if r >= 10.0 => 100.0,
        r if r >= 5.0 => 90.0,
        r if r >= 4.0 => 80.0,
        r if r >= 3.0 => 70.0,
        r if r >= 2.5 => 60.0,
        r if r >= 2.0 => 50.0,
        r if r >= 1.0 => 49.0 * (r - 1.0),
        _ => 0.0,
    }
}

/// Compares the latest volume with its rolling average over `window_days`
/// bars ending at the latest bar.
pub struct VolumeSpikeDetector {
    window_days: usize,
    spike_threshold: f64,
}

impl VolumeSpikeDetector {
    pub fn new(window_days: usize, spike_threshold: f64) -> Self {
        Self {
            window_days,
            spike_threshold,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.window_days, config.volume_spike_threshold)
    }

    pub fn detect(&self, series: &PriceSeries) -> Result<VolumeDetection, DetectionError> {
        series.require(self.window_days.max(2))?;

        let volumes = series.volumes();
        let n = volumes.len();
        let current_volume = volumes[n - 1];
        let average_volume =
            volumes[n - self.window_days..].iter().sum::<f64>() / self.window_days as f64;
        let closes = series.closes();
        let price_change = if closes[n - 2] > 0.0 {
            (closes[n - 1] - closes[n - 2]) / closes[n - 2] * 100.0
        } else {
            0.0
        };

        if average_volume <= 0.0 {
            debug!(
                "VolumeSpikeDetector: {} has zero average volume",
                series.ticker()
            );
            let result = DetectorResult::new(false, 0.0, "Invalid volume data: zero average volume")
                .with_number("current_volume", current_volume)
                .with_number("average_volume", 0.0)
                .with_number("volume_ratio", 0.0);
            return Ok(VolumeDetection {
                result,
                ratio: 0.0,
                current_volume,
                average_volume,
            });
        }

        let ratio = current_volume / average_volume;
        let score = volume_score(ratio);
        let is_suspicious = ratio >= self.spike_threshold;

        let result = DetectorResult::new(is_suspicious, score, Self::message(ratio, score))
            .with_number("current_volume", current_volume)
            .with_number("average_volume", average_volume)
            .with_number("volume_ratio", ratio)
            .with_number("price_change_percent", price_change)
            .with_number("threshold_used", self.spike_threshold);

        Ok(VolumeDetection {
            result,
            ratio,
            current_volume,
            average_volume,
        })
    }

    /// Same as `detect`, additionally comparing against an earlier volume reading.
    /// A rise of more than 100% adds 20 points and forces suspicion.
    pub fn detect_with_previous(
        &self,
        series: &PriceSeries,
        previous_volume: f64,
    ) -> Result<VolumeDetection, DetectionError> {
        let mut detection = self.detect(series)?;

        let change_pct = if previous_volume > 0.0 {
            (detection.current_volume - previous_volume) / previous_volume * 100.0
        } else {
            0.0
        };

        let mut result = detection
            .result
            .with_number("recent_volume_change_percent", change_pct);
        if change_pct > 100.0 {
            result.score = (result.score + 20.0).min(100.0);
            result.is_suspicious = true;
        }
        detection.result = result;
        Ok(detection)
    }

    fn message(ratio: f64, score: f64) -> String {
        match score {
            s if s >= 80.0 => format!(
                "EXTREME VOLUME SPIKE: {:.2}x normal volume detected. High manipulation risk!",
                ratio
            ),
            s if s >= 60.0 => format!(
                "HIGH VOLUME SPIKE: {:.2}x normal volume detected. Suspicious activity.",
                ratio
            ),
            s if s >= 40.0 => format!(
                "MODERATE VOLUME SPIKE: {:.2}x normal volume detected. Monitor closely.",
                ratio
            ),
            s if s >= 20.0 => format!(
                "SLIGHT VOLUME INCREASE: {:.2}x normal volume. May be normal market activity.",
                ratio
            ),
            _ => format!("NORMAL VOLUME: {:.2}x average. No anomaly detected.", ratio),
        }
    }
}
