use crate::domain::errors::ModelError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the persisted model layout. Bumped on any incompatible change.
pub const MODEL_SCHEMA_VERSION: u32 = 1;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Average path length of an unsuccessful search in a binary search tree of `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Per-feature standardization fitted on the training set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl FeatureScaler {
    /// Fits population mean/std per column. Zero-variance columns get std 1.
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> Self {
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; n_features];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut stds = vec![0.0; n_features];
        for row in rows {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        let stds = stds
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Self { means, stds }
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IsolationNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// One random-partitioning tree, stored as a flat node arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<IsolationNode>,
}

impl IsolationTree {
    /// Depth at which `x` is isolated, plus the expected remaining depth of the leaf.
    pub fn path_length(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes.get(index) {
                Some(IsolationNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature).copied().unwrap_or(0.0);
                    index = if value < *threshold { *left } else { *right };
                    depth += 1.0;
                }
                Some(IsolationNode::Leaf { size }) => return depth + average_path_length(*size),
                None => return depth,
            }
        }
    }

    fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let IsolationNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= n_features {
                    return Err(format!("node {} splits on unknown feature {}", i, feature));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {} has non-finite threshold", i));
                }
                // Children are always appended after their parent.
                if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len()
                {
                    return Err(format!("node {} has invalid child index", i));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    pub trees: Vec<IsolationTree>,
    pub subsample_size: usize,
    pub max_depth: usize,
    pub seed: u64,
    /// Indicator value at the contamination quantile of the training set.
    pub threshold: f64,
}

impl Ensemble {
    /// Anomaly indicator `s = 2^(-E[h(x)] / c(psi))`, in (0, 1].
    pub fn anomaly_indicator(&self, x: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let mean_path =
            self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let c = average_path_length(self.subsample_size);
        if c <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / c)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub n_samples: usize,
    pub n_features: usize,
    pub contamination: f64,
    pub n_anomalies_detected: usize,
    pub trained_at: DateTime<Utc>,
    pub schema_version: u32,
}

/// Trained outlier model. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub feature_names: Vec<String>,
    pub scaler: FeatureScaler,
    pub ensemble: Ensemble,
    pub metadata: TrainingMetadata,
}

impl ModelState {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Structural validation run after every load.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.metadata.schema_version != MODEL_SCHEMA_VERSION {
            return Err(ModelError::SchemaVersion {
                found: self.metadata.schema_version,
                expected: MODEL_SCHEMA_VERSION,
            });
        }

        let n = self.feature_names.len();
        if n == 0 {
            return Err(ModelError::SchemaMismatch {
                reason: "model has no features".to_string(),
            });
        }
        if self.scaler.means.len() != n || self.scaler.stds.len() != n {
            return Err(ModelError::SchemaMismatch {
                reason: format!(
                    "scaler has {}/{} parameters for {} features",
                    self.scaler.means.len(),
                    self.scaler.stds.len(),
                    n
                ),
            });
        }
        if self.metadata.n_features != n {
            return Err(ModelError::SchemaMismatch {
                reason: format!(
                    "metadata declares {} features, schema lists {}",
                    self.metadata.n_features, n
                ),
            });
        }
        if self.scaler.means.iter().any(|m| !m.is_finite())
            || self.scaler.stds.iter().any(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(ModelError::Corrupt {
                reason: "invalid normalization parameters".to_string(),
            });
        }
        if self.ensemble.trees.is_empty() || self.ensemble.subsample_size < 2 {
            return Err(ModelError::Corrupt {
                reason: "ensemble is empty".to_string(),
            });
        }
        if !self.ensemble.threshold.is_finite() {
            return Err(ModelError::Corrupt {
                reason: "non-finite decision threshold".to_string(),
            });
        }
        for (i, tree) in self.ensemble.trees.iter().enumerate() {
            tree.check(n).map_err(|reason| ModelError::Corrupt {
                reason: format!("tree {}: {}", i, reason),
            })?;
        }
        Ok(())
    }
}
