pub mod price_anomaly;
pub mod volume_spike;

pub use price_anomaly::{PriceAnomalyDetector, PriceDetection};
pub use volume_spike::{VolumeDetection, VolumeSpikeDetector};
