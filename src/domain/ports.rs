use crate::domain::errors::ModelError;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ml::model_state::ModelState;
use crate::domain::sentiment::SocialSignal;
use anyhow::Result;
use async_trait::async_trait;

/// Supplies historical bars for a ticker. The engine never fetches data itself.
#[async_trait]
pub trait PriceSeriesSource: Send + Sync {
    async fn fetch_series(&self, ticker: &str, lookback_days: usize) -> Result<PriceSeries>;
}

/// Supplies the optional social-manipulation score for a ticker.
#[async_trait]
pub trait SocialSignalSource: Send + Sync {
    async fn fetch_signal(&self, ticker: &str) -> Result<Option<SocialSignal>>;
}

/// Persistence for trained outlier models. Read-only at scoring time.
pub trait ModelArtifactStore: Send + Sync {
    fn load(&self) -> Result<ModelState, ModelError>;
    fn save(&self, model: &ModelState) -> Result<(), ModelError>;
}
