use crate::domain::errors::SeriesError;
use crate::domain::market::price_series::Bar;
use tracing::warn;

/// Centralized validator for price series integrity.
///
/// Rejects bars that are physically impossible: non-finite fields, non-positive
/// prices, inverted ranges, negative volume, and dates that do not strictly increase.
pub struct SeriesValidator;

impl SeriesValidator {
    pub fn validate(ticker: &str, bars: &[Bar]) -> Result<(), SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            Self::validate_bar(ticker, index, bar)?;
        }

        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                warn!(
                    "Validation FAILED: {} bar #{} dated {} does not follow {}",
                    ticker,
                    index + 1,
                    pair[1].date,
                    pair[0].date
                );
                return Err(SeriesError::NonMonotonicDates {
                    ticker: ticker.to_string(),
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }

        Ok(())
    }

    /// Validates a single bar.
    pub fn validate_bar(ticker: &str, index: usize, bar: &Bar) -> Result<(), SeriesError> {
        let malformed = |reason: String| {
            warn!("Validation FAILED: {} bar #{}: {}", ticker, index, reason);
            SeriesError::MalformedBar {
                ticker: ticker.to_string(),
                index,
                reason,
            }
        };

        let fields = [bar.open, bar.high, bar.low, bar.close, bar.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(malformed("non-finite field".to_string()));
        }

        if bar.open <= 0.0 || bar.high <= 0.0 || bar.low <= 0.0 || bar.close <= 0.0 {
            return Err(malformed("non-positive price component(s)".to_string()));
        }

        if bar.low > bar.high {
            return Err(malformed(format!("low {} > high {}", bar.low, bar.high)));
        }

        if bar.volume < 0.0 {
            return Err(malformed(format!("negative volume {}", bar.volume)));
        }

        Ok(())
    }
}
