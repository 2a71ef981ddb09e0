use crate::domain::market::price_series::{Bar, PriceSeries};
use crate::domain::ports::PriceSeriesSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One row of an OHLCV export. Accepts lowercase headers or the common
/// `Date,Open,High,Low,Close,Volume` layout.
#[derive(Debug, Deserialize)]
struct CsvBar {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

/// Reads `<dir>/<TICKER>.csv` files holding daily bars in date order.
pub struct CsvPriceSeriesSource {
    dir: PathBuf,
}

impl CsvPriceSeriesSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker))
    }

    /// Tickers with a CSV file in the directory, sorted.
    pub async fn tickers(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut tickers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                tickers.push(stem.to_string());
            }
        }
        tickers.sort();
        Ok(tickers)
    }

    /// Decodes rows without checking them as a series. Ordering and
    /// bar sanity are left to `PriceSeries::new`.
    pub fn parse_bars(ticker: &str, content: &str) -> Result<Vec<Bar>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut bars = Vec::new();
        for (i, row) in reader.deserialize::<CsvBar>().enumerate() {
            let row = row.with_context(|| format!("{}: bad row {}", ticker, i + 1))?;
            bars.push(Bar::new(
                row.date, row.open, row.high, row.low, row.close, row.volume,
            ));
        }
        Ok(bars)
    }

    pub fn parse(ticker: &str, content: &str) -> Result<PriceSeries> {
        let bars = Self::parse_bars(ticker, content)?;
        PriceSeries::new(ticker, bars).with_context(|| format!("{}: invalid price series", ticker))
    }

    /// Raw bars for `ticker`, keeping the last `lookback_days` (0 keeps all).
    pub async fn fetch_bars(&self, ticker: &str, lookback_days: usize) -> Result<Vec<Bar>> {
        let content = self.read(&self.path_for(ticker)).await?;
        let mut bars = Self::parse_bars(ticker, &content)?;
        if lookback_days > 0 && bars.len() > lookback_days {
            bars.drain(..bars.len() - lookback_days);
        }
        Ok(bars)
    }

    async fn read(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

#[async_trait]
impl PriceSeriesSource for CsvPriceSeriesSource {
    /// `lookback_days` of 0 returns the whole file.
    async fn fetch_series(&self, ticker: &str, lookback_days: usize) -> Result<PriceSeries> {
        let bars = self.fetch_bars(ticker, lookback_days).await?;
        debug!("CsvPriceSeriesSource: {} has {} bars", ticker, bars.len());
        PriceSeries::new(ticker, bars).with_context(|| format!("{}: invalid price series", ticker))
    }
}
