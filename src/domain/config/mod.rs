//! Configuration domain module
//!
//! Domain value objects for the scoring pipeline configuration.

pub mod detection_config;

pub use detection_config::{DetectionConfig, DetectionConfigError};
