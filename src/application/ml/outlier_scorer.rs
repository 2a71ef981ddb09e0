use super::isolation_forest::IsolationForestTrainer;
use super::predictor::{AnomalyPredictor, MlPrediction};
use crate::domain::detection::ComponentOutcome;
use crate::domain::errors::ModelError;
use crate::domain::ml::feature_registry::{FeatureVector, feature_index};
use crate::domain::ml::model_state::ModelState;
use crate::domain::ports::ModelArtifactStore;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Indicator value mapped to score 0.
const SCORE_OFFSET: f64 = 0.35;
/// Score points per unit of indicator.
const SCORE_SCALE: f64 = 200.0;

/// Maps the isolation indicator onto 0-100.
pub fn indicator_to_score(indicator: f64) -> f64 {
    (SCORE_SCALE * (indicator - SCORE_OFFSET)).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScorerState {
    Untrained,
    Trained,
    Loaded,
    Disabled { reason: String },
}

/// Outlier model lifecycle: train or load once, then score read-only.
///
/// A scorer whose artifact is missing, corrupt or incompatible is built in the
/// `Disabled` state instead of failing; callers see `Unavailable` outcomes.
#[derive(Debug, Clone)]
pub struct OutlierScorer {
    model: Option<ModelState>,
    state: ScorerState,
}

impl OutlierScorer {
    pub fn untrained() -> Self {
        Self {
            model: None,
            state: ScorerState::Untrained,
        }
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            model: None,
            state: ScorerState::Disabled {
                reason: reason.into(),
            },
        }
    }

    pub fn train(
        trainer: &IsolationForestTrainer,
        vectors: &[FeatureVector],
    ) -> Result<Self, ModelError> {
        let model = trainer.fit(vectors)?;
        Ok(Self {
            model: Some(model),
            state: ScorerState::Trained,
        })
    }

    /// Wraps an already built model after validating it.
    pub fn from_model(model: ModelState) -> Result<Self, ModelError> {
        Self::check_model(&model)?;
        Ok(Self {
            model: Some(model),
            state: ScorerState::Loaded,
        })
    }

    /// Loads the artifact from `store`. Any failure yields a disabled scorer.
    pub fn load(store: &dyn ModelArtifactStore) -> Self {
        match store.load().and_then(Self::from_model) {
            Ok(scorer) => {
                if let Some(model) = &scorer.model {
                    info!(
                        "Loaded outlier model: {} trees, {} features, trained {} on {} samples",
                        model.ensemble.trees.len(),
                        model.n_features(),
                        model.metadata.trained_at,
                        model.metadata.n_samples
                    );
                }
                scorer
            }
            Err(ModelError::NotFound { path }) => {
                warn!(
                    "Outlier model not found at {}. ML component disabled.",
                    path
                );
                Self::disabled(format!("Model artifact not found: {}", path))
            }
            Err(e) => {
                error!("Failed to load outlier model: {}. ML component disabled.", e);
                Self::disabled(e.to_string())
            }
        }
    }

    pub fn persist(&self, store: &dyn ModelArtifactStore) -> Result<(), ModelError> {
        let model = self.model.as_ref().ok_or_else(|| ModelError::Training {
            reason: "no trained model to persist".to_string(),
        })?;
        store.save(model)?;
        info!("Persisted outlier model ({} trees)", model.ensemble.trees.len());
        Ok(())
    }

    fn check_model(model: &ModelState) -> Result<(), ModelError> {
        model.validate()?;
        if let Some(unknown) = model
            .feature_names
            .iter()
            .find(|name| feature_index(name).is_none())
        {
            return Err(ModelError::SchemaMismatch {
                reason: format!("model expects unknown feature {}", unknown),
            });
        }
        Ok(())
    }

    pub fn state(&self) -> &ScorerState {
        &self.state
    }

    pub fn model(&self) -> Option<&ModelState> {
        self.model.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some() && !matches!(self.state, ScorerState::Disabled { .. })
    }

    /// Normalized model input in schema order.
    fn prepare(
        &self,
        model: &ModelState,
        features: &FeatureVector,
    ) -> Result<(Vec<f64>, Vec<String>, Vec<String>), ModelError> {
        let mut input = Vec::with_capacity(model.n_features());
        let mut missing = Vec::new();

        for (i, name) in model.feature_names.iter().enumerate() {
            match features.get(name) {
                Some(v) if v.is_finite() => {
                    input.push((v - model.scaler.means[i]) / model.scaler.stds[i]);
                }
                Some(v) => {
                    return Err(ModelError::InvalidFeatures {
                        reason: format!("{} = {} is not finite", name, v),
                    });
                }
                None => {
                    missing.push(name.clone());
                    input.push(0.0);
                }
            }
        }

        let ignored: Vec<String> = features
            .names()
            .into_iter()
            .filter(|name| !model.feature_names.iter().any(|m| m.as_str() == *name))
            .map(str::to_string)
            .collect();

        if !missing.is_empty() {
            warn!(
                "{}: {} model feature(s) missing, scored at training mean: {:?}",
                features.ticker,
                missing.len(),
                missing
            );
        }
        if !ignored.is_empty() {
            warn!(
                "{}: ignoring {} feature(s) unknown to the model: {:?}",
                features.ticker,
                ignored.len(),
                ignored
            );
        }

        Ok((input, missing, ignored))
    }

    /// Features ranked by how far a +1 sigma move from the training mean shifts the indicator.
    pub fn feature_importance(&self, top_n: usize) -> Vec<(String, f64)> {
        let Some(model) = &self.model else {
            return Vec::new();
        };
        let baseline_input = vec![0.0; model.n_features()];
        let baseline = model.ensemble.anomaly_indicator(&baseline_input);

        let mut ranked: Vec<(String, f64)> = model
            .feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut probe = baseline_input.clone();
                probe[i] = 1.0;
                let shift = (model.ensemble.anomaly_indicator(&probe) - baseline).abs();
                (name.clone(), shift)
            })
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top_n);
        ranked
    }
}

impl AnomalyPredictor for OutlierScorer {
    fn predict(&self, features: &FeatureVector) -> ComponentOutcome<MlPrediction> {
        let model = match (&self.model, &self.state) {
            (_, ScorerState::Disabled { reason }) => {
                return ComponentOutcome::unavailable(reason.clone());
            }
            (None, _) => return ComponentOutcome::unavailable("ML model not trained"),
            (Some(model), _) => model,
        };

        let (input, missing_features, ignored_features) = match self.prepare(model, features) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!("{}: ML prediction skipped: {}", features.ticker, e);
                return ComponentOutcome::unavailable(format!("ML prediction error: {}", e));
            }
        };

        let anomaly_indicator = model.ensemble.anomaly_indicator(&input);
        let score = indicator_to_score(anomaly_indicator);
        debug!(
            "{}: isolation indicator {:.4} -> ML score {:.1}",
            features.ticker, anomaly_indicator, score
        );

        ComponentOutcome::Scored(MlPrediction {
            score,
            anomaly_indicator,
            threshold: model.ensemble.threshold,
            is_anomaly: anomaly_indicator >= model.ensemble.threshold,
            missing_features,
            ignored_features,
        })
    }

    fn unavailable_reason(&self) -> Option<String> {
        match (&self.model, &self.state) {
            (_, ScorerState::Disabled { reason }) => Some(reason.clone()),
            (None, _) => Some("ML model not trained".to_string()),
            _ => None,
        }
    }

    fn name(&self) -> &str {
        "isolation_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_registry::{FEATURE_COUNT, FEATURE_NAMES};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn training_set() -> Vec<FeatureVector> {
        (0..60)
            .map(|i| {
                let values: Vec<f64> = (0..FEATURE_COUNT)
                    .map(|f| ((i * 13 + f * 7) % 17) as f64 * 0.1)
                    .collect();
                FeatureVector::from_registry("TRN", date(), &values)
            })
            .collect()
    }

    fn trained() -> OutlierScorer {
        let trainer = IsolationForestTrainer {
            n_trees: 20,
            max_samples: 32,
            contamination: 0.1,
            seed: 42,
        };
        OutlierScorer::train(&trainer, &training_set()).unwrap()
    }

    struct MemoryStore {
        slot: Mutex<Option<ModelState>>,
    }

    impl ModelArtifactStore for MemoryStore {
        fn load(&self) -> Result<ModelState, ModelError> {
            self.slot
                .lock()
                .unwrap()
                .clone()
                .ok_or(ModelError::NotFound {
                    path: "memory".to_string(),
                })
        }

        fn save(&self, model: &ModelState) -> Result<(), ModelError> {
            *self.slot.lock().unwrap() = Some(model.clone());
            Ok(())
        }
    }

    #[test]
    fn test_indicator_mapping() {
        assert_eq!(indicator_to_score(0.30), 0.0);
        assert_eq!(indicator_to_score(0.35), 0.0);
        assert!((indicator_to_score(0.60) - 50.0).abs() < 1e-9);
        assert_eq!(indicator_to_score(0.90), 100.0);
    }

    #[test]
    fn test_untrained_is_unavailable() {
        let scorer = OutlierScorer::untrained();
        let fv = FeatureVector::from_registry("X", date(), &[0.0; FEATURE_COUNT]);
        assert!(!scorer.predict(&fv).is_scored());
        assert!(scorer.unavailable_reason().is_some());
    }

    #[test]
    fn test_train_persist_load_predict() {
        let scorer = trained();
        assert_eq!(scorer.state(), &ScorerState::Trained);

        let store = MemoryStore {
            slot: Mutex::new(None),
        };
        scorer.persist(&store).unwrap();
        let loaded = OutlierScorer::load(&store);
        assert_eq!(loaded.state(), &ScorerState::Loaded);
        assert!(loaded.is_enabled());

        let fv = training_set().remove(5);
        let a = scorer.predict(&fv);
        let b = loaded.predict(&fv);
        assert_eq!(a, b);
        let prediction = b.as_scored().unwrap();
        assert!((0.0..=100.0).contains(&prediction.score));
    }

    #[test]
    fn test_missing_artifact_disables() {
        let store = MemoryStore {
            slot: Mutex::new(None),
        };
        let scorer = OutlierScorer::load(&store);
        assert!(!scorer.is_enabled());
        assert!(matches!(scorer.state(), ScorerState::Disabled { .. }));
        assert!(scorer.unavailable_reason().unwrap().contains("not found"));
    }

    #[test]
    fn test_version_mismatch_disables() {
        let mut model = trained().model().unwrap().clone();
        model.metadata.schema_version += 1;
        let store = MemoryStore {
            slot: Mutex::new(Some(model)),
        };
        let scorer = OutlierScorer::load(&store);
        assert!(!scorer.is_enabled());
    }

    #[test]
    fn test_unknown_schema_feature_disables() {
        let mut model = trained().model().unwrap().clone();
        model.feature_names[0] = "not_a_feature".to_string();
        assert!(matches!(
            OutlierScorer::from_model(model),
            Err(ModelError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_reorders_and_tolerates_partial_input() {
        let scorer = trained();
        let base = training_set().remove(2);

        let mut reversed: Vec<(String, f64)> =
            base.iter().map(|(n, v)| (n.to_string(), v)).collect();
        reversed.reverse();
        let shuffled = FeatureVector::from_entries("TRN", date(), reversed);
        assert_eq!(scorer.predict(&base), scorer.predict(&shuffled));

        let partial = base.clone().without("gap_pct").with("brand_new_signal", 4.0);
        let prediction = scorer.predict(&partial);
        let prediction = prediction.as_scored().unwrap();
        assert_eq!(prediction.missing_features, vec!["gap_pct".to_string()]);
        assert_eq!(prediction.ignored_features, vec!["brand_new_signal".to_string()]);
    }

    #[test]
    fn test_non_finite_input_is_unavailable_for_that_call() {
        let scorer = trained();
        let bad = training_set().remove(0).with("dollar_volume", f64::NAN);
        assert!(!scorer.predict(&bad).is_scored());
        assert!(scorer.predict(&training_set().remove(0)).is_scored());
        assert!(scorer.is_enabled());
    }

    #[test]
    fn test_feature_importance_top_n() {
        let scorer = trained();
        let top = scorer.feature_importance(5);
        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(top.iter().all(|(name, _)| FEATURE_NAMES.contains(&name.as_str())));
        assert!(OutlierScorer::untrained().feature_importance(5).is_empty());
    }
}
