use crate::domain::config::DetectionConfig;
use crate::domain::errors::ModelError;
use crate::domain::ml::feature_registry::{FEATURE_NAMES, FeatureVector};
use crate::domain::ml::model_state::{
    Ensemble, FeatureScaler, IsolationNode, IsolationTree, MODEL_SCHEMA_VERSION, ModelState,
    TrainingMetadata,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

/// Fits an isolation forest over registry-ordered feature vectors.
///
/// Every tree draws from its own `StdRng` seeded with `seed + tree index`, so
/// the ensemble is reproducible regardless of how rayon schedules the work.
#[derive(Debug, Clone)]
pub struct IsolationForestTrainer {
    pub n_trees: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestTrainer {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.10,
            seed: 42,
        }
    }
}

impl IsolationForestTrainer {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.random_seed,
        }
    }

    pub fn fit(&self, vectors: &[FeatureVector]) -> Result<ModelState, ModelError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ModelError::Training {
                reason: format!("contamination {} outside (0, 0.5]", self.contamination),
            });
        }
        if self.n_trees == 0 {
            return Err(ModelError::Training {
                reason: "n_trees must be positive".to_string(),
            });
        }
        if vectors.len() < 2 {
            return Err(ModelError::Training {
                reason: format!("need at least 2 samples, got {}", vectors.len()),
            });
        }

        let raw = vectors
            .iter()
            .map(registry_row)
            .collect::<Result<Vec<_>, _>>()?;
        let n_features = FEATURE_NAMES.len();

        let scaler = FeatureScaler::fit(&raw, n_features);
        let data: Vec<Vec<f64>> = raw.iter().map(|row| scaler.transform(row)).collect();

        let subsample_size = self.max_samples.min(data.len()).max(2);
        let max_depth = (subsample_size as f64).log2().ceil() as usize;

        let trees: Vec<IsolationTree> = (0..self.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let sample = rand::seq::index::sample(&mut rng, data.len(), subsample_size).into_vec();
                build_tree(&data, sample, max_depth, &mut rng)
            })
            .collect();

        let mut ensemble = Ensemble {
            trees,
            subsample_size,
            max_depth,
            seed: self.seed,
            threshold: 0.5,
        };

        let indicators: Vec<f64> = data
            .par_iter()
            .map(|row| ensemble.anomaly_indicator(row))
            .collect();
        ensemble.threshold = contamination_threshold(&indicators, self.contamination);
        let n_anomalies = indicators
            .iter()
            .filter(|s| **s >= ensemble.threshold)
            .count();

        info!(
            "IsolationForestTrainer: fitted {} trees on {} samples x {} features (threshold {:.4}, {} flagged)",
            self.n_trees,
            data.len(),
            n_features,
            ensemble.threshold,
            n_anomalies
        );

        Ok(ModelState {
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            scaler,
            ensemble,
            metadata: TrainingMetadata {
                n_samples: data.len(),
                n_features,
                contamination: self.contamination,
                n_anomalies_detected: n_anomalies,
                trained_at: Utc::now(),
                schema_version: MODEL_SCHEMA_VERSION,
            },
        })
    }
}

fn registry_row(vector: &FeatureVector) -> Result<Vec<f64>, ModelError> {
    FEATURE_NAMES
        .iter()
        .map(|name| match vector.get(name) {
            Some(v) if v.is_finite() => Ok(v),
            Some(_) => Err(ModelError::InvalidFeatures {
                reason: format!("{} is non-finite for {} on {}", name, vector.ticker, vector.date),
            }),
            None => Err(ModelError::InvalidFeatures {
                reason: format!("{} missing for {} on {}", name, vector.ticker, vector.date),
            }),
        })
        .collect()
}

/// Indicator value at the `contamination` quantile, counted from the most anomalous.
pub fn contamination_threshold(indicators: &[f64], contamination: f64) -> f64 {
    if indicators.is_empty() {
        return 0.5;
    }
    let mut sorted = indicators.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let k = ((contamination * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len());
    sorted[k - 1]
}

fn build_tree(
    data: &[Vec<f64>],
    sample: Vec<usize>,
    max_depth: usize,
    rng: &mut StdRng,
) -> IsolationTree {
    let mut nodes = Vec::new();
    grow(data, sample, 0, max_depth, rng, &mut nodes);
    IsolationTree { nodes }
}

fn grow(
    data: &[Vec<f64>],
    rows: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
    nodes: &mut Vec<IsolationNode>,
) -> usize {
    let index = nodes.len();
    nodes.push(IsolationNode::Leaf { size: rows.len() });

    if depth >= max_depth || rows.len() <= 1 {
        return index;
    }

    let n_features = data[rows[0]].len();
    let mut candidates: Vec<usize> = (0..n_features).collect();
    candidates.shuffle(rng);

    // First feature in random order that still varies across this node.
    let split = candidates.into_iter().find_map(|feature| {
        let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            let v = data[*r][feature];
            (lo.min(v), hi.max(v))
        });
        (max - min > 1e-12).then_some((feature, min, max))
    });

    let Some((feature, min, max)) = split else {
        return index;
    };

    let threshold = rng.random_range(min..max);
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|r| data[*r][feature] < threshold);

    let left = grow(data, left_rows, depth + 1, max_depth, rng, nodes);
    let right = grow(data, right_rows, depth + 1, max_depth, rng, nodes);
    nodes[index] = IsolationNode::Split {
        feature,
        threshold,
        left,
        right,
    };
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cluster(n: usize) -> Vec<FeatureVector> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        (0..n)
            .map(|i| {
                let values: Vec<f64> = (0..FEATURE_NAMES.len())
                    .map(|_| rng.random_range(0.0..1.0))
                    .collect();
                FeatureVector::from_registry(format!("T{}", i), date, &values)
            })
            .collect()
    }

    fn small_trainer() -> IsolationForestTrainer {
        IsolationForestTrainer {
            n_trees: 25,
            max_samples: 64,
            contamination: 0.1,
            seed: 42,
        }
    }

    #[test]
    fn test_threshold_quantile() {
        let scores = [0.9, 0.1, 0.5, 0.7, 0.3, 0.2, 0.4, 0.6, 0.8, 0.35];
        assert_eq!(contamination_threshold(&scores, 0.1), 0.9);
        assert_eq!(contamination_threshold(&scores, 0.2), 0.8);
        assert_eq!(contamination_threshold(&scores, 0.25), 0.7);
    }

    #[test]
    fn test_fit_produces_valid_model() {
        let model = small_trainer().fit(&cluster(80)).unwrap();

        assert!(model.validate().is_ok());
        assert_eq!(model.ensemble.trees.len(), 25);
        assert_eq!(model.ensemble.subsample_size, 64);
        assert_eq!(model.metadata.n_samples, 80);
        assert_eq!(model.n_features(), FEATURE_NAMES.len());
        assert!(model.metadata.n_anomalies_detected >= 8);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let data = cluster(60);
        let a = small_trainer().fit(&data).unwrap();
        let b = small_trainer().fit(&data).unwrap();
        assert_eq!(a.ensemble, b.ensemble);
        assert_eq!(a.scaler, b.scaler);
    }

    #[test]
    fn test_outlier_scores_higher() {
        let model = small_trainer().fit(&cluster(100)).unwrap();

        let center = model.scaler.transform(&[0.5; 47]);
        let outlier = model.scaler.transform(&[25.0; 47]);

        assert!(
            model.ensemble.anomaly_indicator(&outlier) > model.ensemble.anomaly_indicator(&center)
        );
    }

    #[test]
    fn test_rejects_tiny_training_set() {
        assert!(matches!(
            small_trainer().fit(&cluster(1)),
            Err(ModelError::Training { .. })
        ));
    }

    #[test]
    fn test_rejects_incomplete_vectors() {
        let mut data = cluster(10);
        data[4] = data[4].clone().without("gap_pct");
        assert!(matches!(
            small_trainer().fit(&data),
            Err(ModelError::InvalidFeatures { .. })
        ));
    }
}
