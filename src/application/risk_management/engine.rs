use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::application::detectors::price_anomaly::PriceAnomalyDetector;
use crate::application::detectors::volume_spike::VolumeSpikeDetector;
use crate::application::feature_engineering_service::FeatureEngineer;
use crate::application::ml::predictor::{AnomalyPredictor, MlPrediction};
use crate::application::risk_management::risk_fusion::{FusionInputs, RiskFusionEngine};
use crate::domain::config::{DetectionConfig, DetectionConfigError};
use crate::domain::detection::ComponentOutcome;
use crate::domain::errors::{DetectionError, SeriesError};
use crate::domain::market::price_series::{Bar, PriceSeries};
use crate::domain::risk::assessment::{AssessmentOutcome, RiskAssessment};
use crate::domain::sentiment::SocialSignal;

/// Scores one price series end to end: features, detectors, outlier model, fusion.
///
/// The engine holds no mutable state. The predictor is shared read-only, so one
/// engine can serve any number of concurrent `assess` calls.
pub struct RiskEngine {
    config: DetectionConfig,
    engineer: FeatureEngineer,
    volume: VolumeSpikeDetector,
    price: PriceAnomalyDetector,
    fusion: RiskFusionEngine,
    predictor: Arc<dyn AnomalyPredictor>,
}

impl RiskEngine {
    pub fn new(
        config: DetectionConfig,
        predictor: Arc<dyn AnomalyPredictor>,
    ) -> Result<Self, DetectionConfigError> {
        config.validate()?;
        info!(
            "RiskEngine: window {} bars, min history {} bars, predictor '{}'",
            config.window_days,
            config.min_history(),
            predictor.name()
        );
        Ok(Self {
            engineer: FeatureEngineer::new(config.clone()),
            volume: VolumeSpikeDetector::from_config(&config),
            price: PriceAnomalyDetector::from_config(&config),
            fusion: RiskFusionEngine::from_config(&config),
            predictor,
            config,
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Validates raw bars before scoring. Malformed bars and out-of-order dates
    /// come back as `InsufficientData` carrying the validation error.
    pub fn assess_bars(
        &self,
        ticker: &str,
        bars: Vec<Bar>,
        social: Option<&SocialSignal>,
    ) -> AssessmentOutcome {
        let available = bars.len();
        match PriceSeries::new(ticker, bars) {
            Ok(series) => self.assess(&series, social),
            Err(e) => insufficient_raw(ticker, available, self.config.min_history(), e.to_string()),
        }
    }

    /// Parallel `assess_bars`. Output order follows input order.
    pub fn assess_bars_batch(
        &self,
        items: Vec<(String, Vec<Bar>, Option<SocialSignal>)>,
    ) -> Vec<AssessmentOutcome> {
        let outcomes: Vec<AssessmentOutcome> = items
            .into_par_iter()
            .map(|(ticker, bars, social)| self.assess_bars(&ticker, bars, social.as_ref()))
            .collect();
        log_batch(&outcomes);
        outcomes
    }

    /// Scores the latest bar of `series`. Never fails: input that cannot be
    /// scored comes back as `InsufficientData`.
    pub fn assess(&self, series: &PriceSeries, social: Option<&SocialSignal>) -> AssessmentOutcome {
        let required = self.config.min_history();
        if let Err(e) = series.require(required) {
            return insufficient(series, required, e.to_string());
        }
        let Some(latest) = series.latest() else {
            return insufficient(series, required, "empty series".to_string());
        };

        let volume = match self.volume.detect(series) {
            Ok(detection) => ComponentOutcome::Scored(detection),
            Err(e) => match component_failure(e) {
                Ok(reason) => ComponentOutcome::unavailable(reason),
                Err(e) => return insufficient(series, required, e.to_string()),
            },
        };
        let price = match self.price.detect(series) {
            Ok(detection) => ComponentOutcome::Scored(detection),
            Err(e) => match component_failure(e) {
                Ok(reason) => ComponentOutcome::unavailable(reason),
                Err(e) => return insufficient(series, required, e.to_string()),
            },
        };

        let ml = self.score_model(series);
        let social = match social {
            Some(signal) => ComponentOutcome::Scored(signal.clone()),
            None => ComponentOutcome::unavailable("no social signal supplied"),
        };

        let inputs = FusionInputs {
            ticker: series.ticker().to_string(),
            as_of: latest.date,
            volume,
            price,
            ml,
            social,
        };

        match self.fusion.fuse(&inputs) {
            Some(assessment) => {
                debug!(
                    "RiskEngine: {} scored {} ({})",
                    assessment.ticker, assessment.risk_score, assessment.risk_level
                );
                AssessmentOutcome::Assessed(assessment)
            }
            None => insufficient(series, required, "no component produced a score".to_string()),
        }
    }

    /// Scores many series in parallel. Output order follows input order.
    pub fn assess_batch(&self, items: &[(PriceSeries, Option<SocialSignal>)]) -> Vec<AssessmentOutcome> {
        let outcomes: Vec<AssessmentOutcome> = items
            .par_iter()
            .map(|(series, social)| self.assess(series, social.as_ref()))
            .collect();
        log_batch(&outcomes);
        outcomes
    }

    fn score_model(&self, series: &PriceSeries) -> ComponentOutcome<MlPrediction> {
        if let Some(reason) = self.predictor.unavailable_reason() {
            return ComponentOutcome::unavailable(reason);
        }
        match self.engineer.extract_latest(series) {
            Ok(features) => self.predictor.predict(&features),
            Err(e) => {
                warn!("RiskEngine: feature extraction failed for {}: {}", series.ticker(), e);
                ComponentOutcome::unavailable(format!("feature extraction failed: {}", e))
            }
        }
    }
}

fn log_batch(outcomes: &[AssessmentOutcome]) {
    let assessed = outcomes.iter().filter(|o| o.assessment().is_some()).count();
    info!(
        "RiskEngine: batch of {} series, {} assessed, {} insufficient",
        outcomes.len(),
        assessed,
        outcomes.len() - assessed
    );
}

/// Assessed outcomes scoring at or above `threshold`, highest first.
pub fn high_risk(outcomes: &[AssessmentOutcome], threshold: u8) -> Vec<&RiskAssessment> {
    let mut flagged: Vec<&RiskAssessment> = outcomes
        .iter()
        .filter_map(AssessmentOutcome::assessment)
        .filter(|a| a.risk_score >= threshold)
        .collect();
    flagged.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    flagged
}

/// Series problems end the assessment; indicator problems only disable the component.
fn component_failure(error: DetectionError) -> Result<String, SeriesError> {
    match error {
        DetectionError::Series(e) => Err(e),
        DetectionError::Indicator { name, reason } => Ok(format!("{} unavailable: {}", name, reason)),
    }
}

fn insufficient(series: &PriceSeries, required: usize, reason: String) -> AssessmentOutcome {
    insufficient_raw(series.ticker(), series.len(), required, reason)
}

fn insufficient_raw(
    ticker: &str,
    available: usize,
    required: usize,
    reason: String,
) -> AssessmentOutcome {
    info!(
        "RiskEngine: {} not scored ({} of {} bars): {}",
        ticker, available, required, reason
    );
    AssessmentOutcome::InsufficientData {
        ticker: ticker.to_string(),
        reason,
        required_bars: required,
        available_bars: available,
    }
}
