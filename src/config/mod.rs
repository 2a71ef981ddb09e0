//! Configuration module for riskscope.
//!
//! Loads structured configuration from environment variables (and a `.env`
//! file when present), organized by concern: detection tunables and artifact
//! locations.

mod detection_env_config;
mod model_env_config;

pub use detection_env_config::DetectionEnvConfig;
pub use model_env_config::{DEFAULT_DATA_DIR, DEFAULT_MODEL_PATH, ModelEnvConfig};

use crate::domain::config::DetectionConfig;
use anyhow::Result;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub detection: DetectionConfig,
    pub model: ModelEnvConfig,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_process_env()
    }

    /// Reads the process environment only.
    pub fn from_process_env() -> Result<Self> {
        let detection = DetectionEnvConfig::from_env()?.to_detection_config()?;
        Ok(Self {
            detection,
            model: ModelEnvConfig::from_env(),
        })
    }
}
