// Rolling-window statistics shared by the feature engineer and detectors
pub mod statistical_features;
