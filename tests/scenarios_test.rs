mod common;

use common::{FixedPredictor, calm_series, flat_series, pump_series};
use riskscope::application::bootstrap::ModelHandle;
use riskscope::application::risk_management::{RiskEngine, high_risk};
use riskscope::domain::config::DetectionConfig;
use riskscope::domain::risk::assessment::{AssessmentOutcome, RiskLevel};
use riskscope::domain::sentiment::SocialSignal;
use riskscope::infrastructure::JsonModelStore;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn engine_without_model() -> RiskEngine {
    let store = JsonModelStore::new(std::env::temp_dir().join("riskscope_does_not_exist.json"));
    let handle = ModelHandle::new();
    RiskEngine::new(DetectionConfig::default(), handle.predictor(&store)).unwrap()
}

#[test]
fn test_pump_pattern_scores_high() {
    let engine = engine_without_model();
    let outcome = engine.assess(&pump_series("PUMP", 80), None);
    let assessment = outcome.assessment().expect("pump series should be assessed");

    assert!(matches!(
        assessment.risk_level,
        RiskLevel::High | RiskLevel::Extreme
    ));
    assert!(assessment.is_suspicious);
    assert!(
        assessment
            .red_flags
            .iter()
            .any(|f| f.contains("volume spike"))
    );
    assert!(
        assessment
            .red_flags
            .iter()
            .any(|f| f.contains("RSI extremely overbought"))
    );
    assert!(
        assessment
            .red_flags
            .iter()
            .any(|f| f.contains("critical co-occurrence"))
    );
}

#[test]
fn test_flat_series_is_quiet() {
    let engine = engine_without_model();
    let outcome = engine.assess(&flat_series("FLAT", 70), None);
    let assessment = outcome.assessment().unwrap();

    assert_eq!(assessment.scores.price, 0.0);
    assert_eq!(assessment.scores.volume, 0.0);
    assert_eq!(assessment.risk_score, 0);
    assert_eq!(assessment.risk_level, RiskLevel::Low);
    assert!(!assessment.is_suspicious);
    assert!(assessment.red_flags.is_empty());
}

#[test]
fn test_missing_model_redistributes_weights() {
    let engine = engine_without_model();
    let outcome = engine.assess(&calm_series("CALM", 70), None);
    let assessment = outcome.assessment().unwrap();

    assert!(!assessment.ml_status.enabled);
    assert_eq!(assessment.ml_status.score, 0.0);
    assert!(
        assessment
            .ml_status
            .error
            .as_deref()
            .unwrap()
            .contains("not found")
    );
    assert_eq!(assessment.weights.volume, dec!(46.15));
    assert_eq!(assessment.weights.price, dec!(53.85));
    assert_eq!(assessment.weights.ml, dec!(0));
}

#[test]
fn test_short_series_is_explicitly_insufficient() {
    let engine = engine_without_model();
    let outcome = engine.assess(&calm_series("TINY", 40), None);

    match &outcome {
        AssessmentOutcome::InsufficientData {
            required_bars,
            available_bars,
            ..
        } => {
            assert_eq!(*required_bars, 56);
            assert_eq!(*available_bars, 40);
        }
        AssessmentOutcome::Assessed(a) => panic!("unexpected score {}", a.risk_score),
    }

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "insufficient_data");
}

#[test]
fn test_identical_input_gives_identical_bytes() {
    let engine = RiskEngine::new(
        DetectionConfig::default(),
        Arc::new(FixedPredictor { score: Some(42.0) }),
    )
    .unwrap();
    let series = pump_series("SAME", 90);
    let social = SocialSignal::new(55.0, "fixture").unwrap();

    let a = serde_json::to_string(&engine.assess(&series, Some(&social))).unwrap();
    let b = serde_json::to_string(&engine.assess(&series, Some(&social))).unwrap();
    assert_eq!(a, b);

    let batch = engine.assess_batch(&[(series.clone(), Some(social.clone()))]);
    assert_eq!(serde_json::to_string(&batch[0]).unwrap(), a);
}

#[test]
fn test_social_signal_shifts_weights() {
    let engine = RiskEngine::new(
        DetectionConfig::default(),
        Arc::new(FixedPredictor { score: Some(0.0) }),
    )
    .unwrap();
    let social = SocialSignal::new(100.0, "fixture").unwrap();

    let with = engine.assess(&flat_series("S", 70), Some(&social));
    let without = engine.assess(&flat_series("S", 70), None);

    let with = with.assessment().unwrap();
    let without = without.assessment().unwrap();
    assert_eq!(with.weights.social, dec!(10));
    assert_eq!(with.risk_score, 10);
    assert_eq!(without.weights.social, dec!(0));
    assert_eq!(without.risk_score, 0);
}

#[test]
fn test_high_risk_filter_sorted() {
    let engine = engine_without_model();
    let items = vec![
        (calm_series("CALM", 80), None),
        (pump_series("PUMP", 80), None),
        (calm_series("SHORT", 30), None),
    ];
    let outcomes = engine.assess_batch(&items);
    let flagged = high_risk(&outcomes, 60);

    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].ticker, "PUMP");
    assert!(flagged[0].alert_summary().contains("STOCK ALERT: PUMP"));
}

#[test]
fn test_out_of_order_dates_are_explicitly_insufficient() {
    let engine = engine_without_model();
    let mut bars = calm_series("BAD", 60).bars().to_vec();
    bars[30].date = bars[10].date;

    let outcome = engine.assess_bars("BAD", bars, None);
    match &outcome {
        AssessmentOutcome::InsufficientData {
            ticker,
            reason,
            required_bars,
            available_bars,
        } => {
            assert_eq!(ticker, "BAD");
            assert!(reason.contains("Non-monotonic dates"), "{}", reason);
            assert_eq!(*required_bars, 56);
            assert_eq!(*available_bars, 60);
        }
        AssessmentOutcome::Assessed(a) => panic!("unexpected score {}", a.risk_score),
    }
    assert_eq!(serde_json::to_value(&outcome).unwrap()["status"], "insufficient_data");
}

#[test]
fn test_duplicate_date_does_not_drop_the_rest_of_the_batch() {
    let engine = engine_without_model();
    let mut dup = calm_series("DUP", 70).bars().to_vec();
    dup[69].date = dup[68].date;

    let outcomes = engine.assess_bars_batch(vec![
        ("DUP".to_string(), dup, None),
        ("CALM".to_string(), calm_series("CALM", 70).bars().to_vec(), None),
    ]);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].ticker(), "DUP");
    assert!(outcomes[0].assessment().is_none());
    assert!(outcomes[1].assessment().is_some());
}
