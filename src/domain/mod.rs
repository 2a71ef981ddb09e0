// Market data domain
pub mod market;

// Detector output contract
pub mod detection;

// Outlier model schema and artifact
pub mod ml;

// Port interfaces
pub mod ports;

// Risk scoring domain
pub mod risk;

// Externally supplied social signal
pub mod sentiment;

// Input validation
pub mod validation;

// Configuration value objects
pub mod config;

// Domain-specific error types
pub mod errors;
