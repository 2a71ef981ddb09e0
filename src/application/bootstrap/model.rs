use std::sync::{Arc, OnceLock};
use tracing::info;

use crate::application::ml::outlier_scorer::OutlierScorer;
use crate::application::ml::predictor::AnomalyPredictor;
use crate::domain::ports::ModelArtifactStore;

/// Holds the scorer built once at startup.
///
/// The first `get_or_load` call reads the artifact; concurrent callers block on
/// that single load and all receive the same `Arc`. A failed load yields a
/// disabled scorer, which is cached like any other.
#[derive(Default)]
pub struct ModelHandle {
    scorer: OnceLock<Arc<OutlierScorer>>,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle pre-populated with an already built scorer.
    pub fn with_scorer(scorer: OutlierScorer) -> Self {
        let handle = Self::new();
        let _ = handle.scorer.set(Arc::new(scorer));
        handle
    }

    pub fn get_or_load(&self, store: &dyn ModelArtifactStore) -> Arc<OutlierScorer> {
        self.scorer
            .get_or_init(|| {
                let scorer = OutlierScorer::load(store);
                info!(
                    "ModelHandle: scorer initialized (enabled: {})",
                    scorer.is_enabled()
                );
                Arc::new(scorer)
            })
            .clone()
    }

    pub fn get(&self) -> Option<Arc<OutlierScorer>> {
        self.scorer.get().cloned()
    }

    /// The scorer as the predictor trait object consumed by `RiskEngine`.
    pub fn predictor(&self, store: &dyn ModelArtifactStore) -> Arc<dyn AnomalyPredictor> {
        self.get_or_load(store)
    }
}
