// Risk scoring domain
pub mod assessment;
pub mod weights;
