pub mod csv_price_source;
pub mod model_store;
pub mod static_social_source;

pub use csv_price_source::CsvPriceSeriesSource;
pub use model_store::JsonModelStore;
pub use static_social_source::StaticSocialSignalSource;
