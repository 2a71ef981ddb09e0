use crate::domain::errors::SeriesError;
use crate::domain::validation::data_quality::SeriesValidator;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Ordered bars for a single ticker.
///
/// Construction validates every bar and the date ordering, so downstream
/// consumers can index freely without re-checking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let ticker = ticker.into();
        SeriesValidator::validate(&ticker, &bars)?;
        Ok(Self { ticker, bars })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Series truncated to the first `len` bars. Used to replay history bar by bar.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            ticker: self.ticker.clone(),
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }

    /// Fails with `InsufficientData` when fewer than `required` bars are present.
    pub fn require(&self, required: usize) -> Result<(), SeriesError> {
        if self.bars.len() < required {
            return Err(SeriesError::InsufficientData {
                ticker: self.ticker.clone(),
                required,
                available: self.bars.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_accessors_follow_bar_order() {
        let series = PriceSeries::new(
            "ACME",
            vec![
                Bar::new(day(1), 10.0, 11.0, 9.0, 10.5, 1000.0),
                Bar::new(day(4), 10.5, 12.0, 10.0, 11.5, 1500.0),
            ],
        )
        .unwrap();

        assert_eq!(series.ticker(), "ACME");
        assert_eq!(series.closes(), vec![10.5, 11.5]);
        assert_eq!(series.volumes(), vec![1000.0, 1500.0]);
        assert_eq!(series.latest().map(|b| b.date), Some(day(4)));
    }

    #[test]
    fn test_require_reports_counts() {
        let series =
            PriceSeries::new("ACME", vec![Bar::new(day(1), 1.0, 1.0, 1.0, 1.0, 0.0)]).unwrap();

        let err = series.require(56).unwrap_err();
        assert_eq!(
            err,
            SeriesError::InsufficientData {
                ticker: "ACME".to_string(),
                required: 56,
                available: 1,
            }
        );
        assert!(series.require(1).is_ok());
    }

    #[test]
    fn test_prefix_truncates() {
        let series = PriceSeries::new(
            "ACME",
            vec![
                Bar::new(day(1), 1.0, 1.0, 1.0, 1.0, 0.0),
                Bar::new(day(2), 1.0, 1.0, 1.0, 1.0, 0.0),
                Bar::new(day(3), 1.0, 1.0, 1.0, 1.0, 0.0),
            ],
        )
        .unwrap();

        assert_eq!(series.prefix(2).len(), 2);
        assert_eq!(series.prefix(10).len(), 3);
    }
}
