//! Locations of the model artifact and the input data used by the binaries.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "models/isolation_forest.json";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    /// `MODEL_PATH`
    pub model_path: PathBuf,
    /// `RISKSCOPE_DATA_DIR`, directory of `<TICKER>.csv` files
    pub data_dir: PathBuf,
}

impl ModelEnvConfig {
    pub fn from_env() -> Self {
        Self {
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH)),
            data_dir: env::var("RISKSCOPE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }
}
