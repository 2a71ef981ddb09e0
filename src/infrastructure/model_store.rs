use crate::domain::errors::ModelError;
use crate::domain::ml::model_state::{MODEL_SCHEMA_VERSION, ModelState};
use crate::domain::ports::ModelArtifactStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// On-disk wrapper. `payload` is the serialized `ModelState`; `checksum` is the
/// hex SHA-256 of `payload` and detects truncated or hand-edited artifacts.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    schema_version: u32,
    checksum: String,
    payload: String,
}

/// JSON model artifact on the local filesystem.
pub struct JsonModelStore {
    path: PathBuf,
}

impl JsonModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checksum(payload: &str) -> String {
        hex::encode(Sha256::digest(payload.as_bytes()))
    }

    fn corrupt(reason: impl Into<String>) -> ModelError {
        ModelError::Corrupt {
            reason: reason.into(),
        }
    }
}

impl ModelArtifactStore for JsonModelStore {
    fn load(&self) -> Result<ModelState, ModelError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ModelError::NotFound {
                    path: self.path.display().to_string(),
                });
            }
            Err(e) => return Err(ModelError::Io(e)),
        };

        let envelope: ArtifactEnvelope = serde_json::from_str(&content)
            .map_err(|e| Self::corrupt(format!("unreadable artifact envelope: {}", e)))?;

        if Self::checksum(&envelope.payload) != envelope.checksum {
            return Err(Self::corrupt("checksum mismatch"));
        }
        if envelope.schema_version != MODEL_SCHEMA_VERSION {
            return Err(ModelError::SchemaVersion {
                found: envelope.schema_version,
                expected: MODEL_SCHEMA_VERSION,
            });
        }

        let model: ModelState = serde_json::from_str(&envelope.payload)
            .map_err(|e| Self::corrupt(format!("unreadable model payload: {}", e)))?;
        info!("Loaded model artifact from {:?}", self.path);
        Ok(model)
    }

    fn save(&self, model: &ModelState) -> Result<(), ModelError> {
        let payload = serde_json::to_string(model)
            .map_err(|e| Self::corrupt(format!("failed to serialize model: {}", e)))?;
        let envelope = ArtifactEnvelope {
            schema_version: model.metadata.schema_version,
            checksum: Self::checksum(&payload),
            payload,
        };
        let content = serde_json::to_string_pretty(&envelope)
            .map_err(|e| Self::corrupt(format!("failed to serialize envelope: {}", e)))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // Atomic write: write to temp file then rename
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;

        info!("Saved model artifact to {:?}", self.path);
        Ok(())
    }
}
