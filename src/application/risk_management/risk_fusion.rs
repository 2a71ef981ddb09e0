use crate::application::detectors::price_anomaly::{
    BandStatus, MomentumStatus, PriceDetection, RsiStatus,
};
use crate::application::detectors::volume_spike::VolumeDetection;
use crate::application::ml::predictor::MlPrediction;
use crate::domain::config::DetectionConfig;
use crate::domain::detection::ComponentOutcome;
use crate::domain::risk::assessment::{ComponentScores, MlStatus, RiskAssessment, RiskLevel};
use crate::domain::risk::weights::{ComponentAvailability, ComponentWeights};
use crate::domain::sentiment::{HypeLevel, SocialSignal};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};
use tracing::debug;

const EXPLANATION_DELIMITER: &str = " | ";

/// Component outcomes for one (ticker, date) pair.
#[derive(Debug, Clone)]
pub struct FusionInputs {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub volume: ComponentOutcome<VolumeDetection>,
    pub price: ComponentOutcome<PriceDetection>,
    pub ml: ComponentOutcome<MlPrediction>,
    pub social: ComponentOutcome<SocialSignal>,
}

impl FusionInputs {
    pub fn availability(&self) -> ComponentAvailability {
        ComponentAvailability {
            volume: self.volume.is_scored(),
            price: self.price.is_scored(),
            ml: self.ml.is_scored(),
            social: self.social.is_scored(),
        }
    }
}

/// Blends component scores into one explainable assessment.
pub struct RiskFusionEngine {
    weights: ComponentWeights,
    suspicious_threshold: u8,
}

impl RiskFusionEngine {
    pub fn new(weights: ComponentWeights, suspicious_threshold: u8) -> Self {
        Self {
            weights,
            suspicious_threshold,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.weights, config.suspicious_threshold)
    }

    /// Returns `None` when no component produced a score.
    pub fn fuse(&self, inputs: &FusionInputs) -> Option<RiskAssessment> {
        let weights = self.weights.redistribute(inputs.availability())?;

        let scores = ComponentScores {
            volume: inputs.volume.as_scored().map_or(0.0, |v| v.result.score),
            price: inputs.price.as_scored().map_or(0.0, |p| p.result.score),
            ml: inputs.ml.as_scored().map_or(0.0, |m| m.score),
            social: inputs.social.as_scored().map_or(0.0, |s| s.score()),
        };

        let risk_score = Self::blend(&weights, &scores);
        let risk_level = RiskLevel::from_score(risk_score);

        let volume_suspicious = inputs
            .volume
            .as_scored()
            .is_some_and(|v| v.result.is_suspicious);
        let price_suspicious = inputs
            .price
            .as_scored()
            .is_some_and(|p| p.result.is_suspicious);
        let co_occurrence = volume_suspicious && price_suspicious;
        let is_suspicious = risk_score >= self.suspicious_threshold || co_occurrence;

        let red_flags = Self::red_flags(inputs, &scores, co_occurrence);
        let explanation = Self::explanation(inputs, risk_score);

        let ml_status = match &inputs.ml {
            ComponentOutcome::Scored(prediction) => MlStatus {
                enabled: true,
                error: None,
                score: prediction.score,
            },
            ComponentOutcome::Unavailable { reason } => MlStatus {
                enabled: false,
                error: Some(reason.clone()),
                score: 0.0,
            },
        };

        debug!(
            "RiskFusionEngine: {} {} -> {} ({}), suspicious={}, {} red flag(s)",
            inputs.ticker,
            inputs.as_of,
            risk_score,
            risk_level,
            is_suspicious,
            red_flags.len()
        );

        Some(RiskAssessment {
            ticker: inputs.ticker.clone(),
            as_of: inputs.as_of,
            risk_score,
            risk_level,
            is_suspicious,
            scores,
            weights,
            red_flags,
            explanation,
            recommendation: risk_level.recommendation().to_string(),
            ml_status,
            details: Self::details(inputs),
        })
    }

    /// Weighted sum over percent weights, rounded half away from zero.
    fn blend(weights: &ComponentWeights, scores: &ComponentScores) -> u8 {
        let w = |d: rust_decimal::Decimal| d.to_f64().unwrap_or(0.0);
        let total = w(weights.volume) * scores.volume
            + w(weights.price) * scores.price
            + w(weights.ml) * scores.ml
            + w(weights.social) * scores.social;
        let blended = (total / 100.0).round();
        if blended.is_finite() {
            blended.clamp(0.0, 100.0) as u8
        } else {
            0
        }
    }

    fn explanation(inputs: &FusionInputs, risk_score: u8) -> String {
        let mut parts = Vec::new();

        if let Some(volume) = inputs
            .volume
            .as_scored()
            .filter(|v| v.result.is_suspicious && v.ratio > 0.0)
        {
            parts.push(format!("Trading volume is {:.2}x above normal", volume.ratio));
        }

        if let Some(price) = inputs.price.as_scored() {
            let ind = &price.indicators;
            if price.result.is_suspicious && ind.return_pct != 0.0 {
                let direction = if ind.return_pct > 0.0 {
                    "increased"
                } else {
                    "decreased"
                };
                parts.push(format!(
                    "Price {} abnormally ({:.1}%, Z-score: {:.1})",
                    direction,
                    ind.return_pct.abs(),
                    ind.z_score
                ));
            }
            match ind.rsi_status {
                RsiStatus::Overbought | RsiStatus::ExtremelyOverbought => {
                    parts.push(format!("RSI indicates overbought condition ({:.1})", ind.rsi));
                }
                RsiStatus::Oversold | RsiStatus::ExtremelyOversold => {
                    parts.push(format!("RSI indicates oversold condition ({:.1})", ind.rsi));
                }
                RsiStatus::Neutral => {}
            }
            match ind.band_status {
                BandStatus::AboveUpper => parts.push("Price above Bollinger Band upper limit".to_string()),
                BandStatus::BelowLower => parts.push("Price below Bollinger Band lower limit".to_string()),
                BandStatus::Inside => {}
            }
        }

        if let Some(ml) = inputs.ml.as_scored() {
            if ml.score >= 70.0 {
                parts.push(format!("ML model detected high-risk pattern (score: {:.0})", ml.score));
            } else if ml.score >= 50.0 {
                parts.push(format!("ML model detected moderate risk (score: {:.0})", ml.score));
            }
            if ml.is_anomaly {
                parts.push("ML model flagged as anomaly pattern".to_string());
            }
        }

        if let Some(social) = inputs
            .social
            .as_scored()
            .filter(|s| matches!(s.hype_level(), HypeLevel::Elevated | HypeLevel::Frenzy))
        {
            parts.push(format!(
                "Social activity {} (score: {:.0}, source: {})",
                social.hype_level(),
                social.score(),
                social.source
            ));
        }

        if parts.is_empty() {
            return if risk_score >= 40 {
                "Multiple weak signals detected - monitor for further activity".to_string()
            } else {
                "No significant anomalies detected - normal trading activity".to_string()
            };
        }
        parts.join(EXPLANATION_DELIMITER)
    }

    fn red_flags(inputs: &FusionInputs, scores: &ComponentScores, co_occurrence: bool) -> Vec<String> {
        let mut flags = Vec::new();

        if let Some(volume) = inputs.volume.as_scored() {
            if scores.volume >= 80.0 {
                flags.push(format!("EXTREME volume spike ({:.2}x normal)", volume.ratio));
            } else if scores.volume >= 60.0 {
                flags.push(format!("HIGH volume spike ({:.2}x normal)", volume.ratio));
            }
        }

        if let Some(price) = inputs.price.as_scored() {
            let ind = &price.indicators;
            if scores.price >= 80.0 {
                flags.push(format!("EXTREME price movement ({:.1}%)", ind.return_pct.abs()));
            } else if scores.price >= 60.0 {
                flags.push(format!("UNUSUAL price movement ({:.1}%)", ind.return_pct.abs()));
            }
            match ind.rsi_status {
                RsiStatus::ExtremelyOverbought => {
                    flags.push(format!("RSI extremely overbought ({:.1})", ind.rsi));
                }
                RsiStatus::ExtremelyOversold => {
                    flags.push(format!("RSI extremely oversold ({:.1})", ind.rsi));
                }
                _ => {}
            }
            if matches!(
                ind.momentum_status,
                MomentumStatus::Extreme | MomentumStatus::VeryHigh
            ) {
                flags.push(format!("High price momentum ({:.1}%)", ind.momentum_pct));
            }
        }

        if let Some(ml) = inputs.ml.as_scored() {
            if ml.score >= 80.0 {
                flags.push(format!("ML MODEL: EXTREME risk detected (score: {:.0})", ml.score));
            } else if ml.score >= 60.0 {
                flags.push(format!("ML MODEL: High risk detected (score: {:.0})", ml.score));
            }
            if ml.is_anomaly {
                flags.push("ML MODEL: Anomaly pattern detected".to_string());
            }
        }

        if let Some(social) = inputs
            .social
            .as_scored()
            .filter(|s| s.hype_level() == HypeLevel::Frenzy)
        {
            flags.push(format!("Social hype at frenzy level (score: {:.0})", social.score()));
        }

        if co_occurrence {
            flags.push(
                "CRITICAL: Both volume AND price showing anomalies (critical co-occurrence)"
                    .to_string(),
            );
        }

        if inputs.ml.is_scored() && scores.ml >= 60.0 && (scores.volume >= 60.0 || scores.price >= 60.0) {
            flags.push("CRITICAL: ML model AND statistical methods both flagging high risk".to_string());
        }

        flags
    }

    fn details(inputs: &FusionInputs) -> Map<String, Value> {
        let mut details = Map::new();

        details.insert(
            "volume".to_string(),
            match &inputs.volume {
                ComponentOutcome::Scored(v) => json!({
                    "is_suspicious": v.result.is_suspicious,
                    "score": v.result.score,
                    "message": v.result.message,
                    "details": v.result.details,
                }),
                ComponentOutcome::Unavailable { reason } => unavailable(reason),
            },
        );

        details.insert(
            "price".to_string(),
            match &inputs.price {
                ComponentOutcome::Scored(p) => json!({
                    "is_suspicious": p.result.is_suspicious,
                    "score": p.result.score,
                    "message": p.result.message,
                    "details": p.result.details,
                    "sub_scores": p.sub_scores,
                }),
                ComponentOutcome::Unavailable { reason } => unavailable(reason),
            },
        );

        details.insert(
            "ml".to_string(),
            match &inputs.ml {
                ComponentOutcome::Scored(m) => serde_json::to_value(m).unwrap_or(Value::Null),
                ComponentOutcome::Unavailable { reason } => unavailable(reason),
            },
        );

        details.insert(
            "social".to_string(),
            match &inputs.social {
                ComponentOutcome::Scored(s) => json!({
                    "score": s.score(),
                    "source": s.source,
                    "hype_level": s.hype_level().to_string(),
                }),
                ComponentOutcome::Unavailable { reason } => unavailable(reason),
            },
        );

        details
    }
}

fn unavailable(reason: &str) -> Value {
    json!({ "available": false, "error": reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::detectors::price_anomaly::{PriceIndicators, PriceSubScores};
    use crate::domain::detection::DetectorResult;
    use rust_decimal_macros::dec;

    fn volume(score: f64, suspicious: bool, ratio: f64) -> ComponentOutcome<VolumeDetection> {
        ComponentOutcome::Scored(VolumeDetection {
            result: DetectorResult::new(suspicious, score, "volume"),
            ratio,
            current_volume: ratio * 1000.0,
            average_volume: 1000.0,
        })
    }

    fn price(score: f64, suspicious: bool, rsi: f64, rsi_status: RsiStatus) -> ComponentOutcome<PriceDetection> {
        ComponentOutcome::Scored(PriceDetection {
            result: DetectorResult::new(suspicious, score, "price"),
            indicators: PriceIndicators {
                return_pct: 12.0,
                z_score: 3.0,
                rsi,
                rsi_status,
                band_upper: 110.0,
                band_middle: 100.0,
                band_lower: 90.0,
                band_status: BandStatus::Inside,
                momentum_pct: 4.0,
                momentum_status: MomentumStatus::Normal,
            },
            sub_scores: PriceSubScores {
                z: score,
                bollinger: 0.0,
                rsi: 0.0,
                momentum: 0.0,
            },
        })
    }

    fn ml(score: f64, is_anomaly: bool) -> ComponentOutcome<MlPrediction> {
        ComponentOutcome::Scored(MlPrediction {
            score,
            anomaly_indicator: 0.35 + score / 200.0,
            threshold: 0.6,
            is_anomaly,
            missing_features: Vec::new(),
            ignored_features: Vec::new(),
        })
    }

    fn inputs(
        volume: ComponentOutcome<VolumeDetection>,
        price: ComponentOutcome<PriceDetection>,
        ml: ComponentOutcome<MlPrediction>,
    ) -> FusionInputs {
        FusionInputs {
            ticker: "TEST".to_string(),
            as_of: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            volume,
            price,
            ml,
            social: ComponentOutcome::unavailable("no social signal supplied"),
        }
    }

    fn engine() -> RiskFusionEngine {
        RiskFusionEngine::from_config(&DetectionConfig::default())
    }

    #[test]
    fn test_disabled_ml_redistributes() {
        let assessment = engine()
            .fuse(&inputs(
                volume(50.0, false, 2.0),
                price(40.0, false, 55.0, RsiStatus::Neutral),
                ComponentOutcome::unavailable("Model artifact not found"),
            ))
            .unwrap();

        assert_eq!(assessment.weights.volume, dec!(46.15));
        assert_eq!(assessment.weights.price, dec!(53.85));
        assert_eq!(assessment.weights.ml, dec!(0));
        assert_eq!(assessment.weights.social, dec!(0));
        // 46.15 * 50 + 53.85 * 40 = 4461.5 -> 44.615
        assert_eq!(assessment.risk_score, 45);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert!(!assessment.ml_status.enabled);
        assert_eq!(assessment.ml_status.score, 0.0);
        assert_eq!(
            assessment.ml_status.error.as_deref(),
            Some("Model artifact not found")
        );
    }

    #[test]
    fn test_override_forces_suspicion() {
        let assessment = engine()
            .fuse(&inputs(
                volume(10.0, true, 2.0),
                price(10.0, true, 50.0, RsiStatus::Neutral),
                ml(0.0, false),
            ))
            .unwrap();

        assert!(assessment.risk_score < 60);
        assert!(assessment.is_suspicious);
        assert!(
            assessment
                .red_flags
                .iter()
                .any(|f| f.contains("critical co-occurrence"))
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let assessment = engine()
            .fuse(&inputs(
                volume(60.0, false, 2.5),
                price(60.0, false, 50.0, RsiStatus::Neutral),
                ml(60.0, false),
            ))
            .unwrap();
        assert_eq!(assessment.risk_score, 60);
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!(assessment.is_suspicious);
    }

    #[test]
    fn test_red_flags_and_explanation_order() {
        let assessment = engine()
            .fuse(&inputs(
                volume(90.0, true, 5.0),
                price(85.0, true, 85.0, RsiStatus::ExtremelyOverbought),
                ml(82.0, true),
            ))
            .unwrap();

        assert_eq!(
            assessment.red_flags,
            vec![
                "EXTREME volume spike (5.00x normal)".to_string(),
                "EXTREME price movement (12.0%)".to_string(),
                "RSI extremely overbought (85.0)".to_string(),
                "ML MODEL: EXTREME risk detected (score: 82)".to_string(),
                "ML MODEL: Anomaly pattern detected".to_string(),
                "CRITICAL: Both volume AND price showing anomalies (critical co-occurrence)"
                    .to_string(),
                "CRITICAL: ML model AND statistical methods both flagging high risk".to_string(),
            ]
        );
        assert_eq!(
            assessment.explanation,
            "Trading volume is 5.00x above normal | Price increased abnormally (12.0%, Z-score: 3.0) | RSI indicates overbought condition (85.0) | ML model detected high-risk pattern (score: 82) | ML model flagged as anomaly pattern"
        );
        assert_eq!(assessment.risk_level, RiskLevel::Extreme);
        assert!(assessment.recommendation.starts_with("DO NOT BUY"));
    }

    #[test]
    fn test_quiet_explanation() {
        let assessment = engine()
            .fuse(&inputs(
                volume(0.0, false, 1.0),
                price(0.0, false, 50.0, RsiStatus::Neutral),
                ml(0.0, false),
            ))
            .unwrap();
        assert_eq!(
            assessment.explanation,
            "No significant anomalies detected - normal trading activity"
        );
        assert!(assessment.red_flags.is_empty());
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_social_signal_counts_when_supplied() {
        let mut all = inputs(
            volume(0.0, false, 1.0),
            price(0.0, false, 50.0, RsiStatus::Neutral),
            ml(0.0, false),
        );
        all.social = ComponentOutcome::Scored(SocialSignal::new(90.0, "telegram").unwrap());

        let assessment = engine().fuse(&all).unwrap();
        assert_eq!(assessment.weights, ComponentWeights::default());
        assert_eq!(assessment.risk_score, 9);
        assert!(
            assessment
                .red_flags
                .iter()
                .any(|f| f.starts_with("Social hype at frenzy level"))
        );
    }

    #[test]
    fn test_nothing_available() {
        let none = inputs(
            ComponentOutcome::unavailable("no volume"),
            ComponentOutcome::unavailable("no price"),
            ComponentOutcome::unavailable("no model"),
        );
        assert!(engine().fuse(&none).is_none());
    }
}
