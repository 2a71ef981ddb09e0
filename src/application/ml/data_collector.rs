use crate::application::feature_engineering_service::FeatureEngineer;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ml::feature_registry::{FEATURE_NAMES, FeatureVector};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

const TICKER_COLUMN: &str = "ticker";
const DATE_COLUMN: &str = "date";

/// Turns price histories into training rows (ticker, date, 47 features).
pub struct TrainingDataCollector {
    engineer: FeatureEngineer,
}

impl TrainingDataCollector {
    pub fn new(engineer: FeatureEngineer) -> Self {
        Self { engineer }
    }

    /// Extracts one row per bar with full history for every series.
    /// Series that are too short or malformed are skipped with a warning.
    pub fn collect(&self, series: &[PriceSeries]) -> Vec<FeatureVector> {
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for s in series {
            match self.engineer.extract_all(s) {
                Ok(mut vectors) => rows.append(&mut vectors),
                Err(e) => {
                    skipped += 1;
                    warn!("TrainingDataCollector: skipping {}: {}", s.ticker(), e);
                }
            }
        }

        info!(
            "TrainingDataCollector: collected {} rows from {} series ({} skipped)",
            rows.len(),
            series.len() - skipped,
            skipped
        );
        rows
    }

    pub fn write_csv<W: Write>(rows: &[FeatureVector], writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec![TICKER_COLUMN, DATE_COLUMN];
        header.extend(FEATURE_NAMES.iter().copied());
        wtr.write_record(&header)?;

        for row in rows {
            let mut record = vec![row.ticker.clone(), row.date.to_string()];
            for name in FEATURE_NAMES.iter() {
                let value = row
                    .get(name)
                    .with_context(|| format!("{} missing for {} on {}", name, row.ticker, row.date))?;
                record.push(value.to_string());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Vec<FeatureVector>> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();

        let ticker_idx = headers.iter().position(|h| h == TICKER_COLUMN);
        let date_idx = headers.iter().position(|h| h == DATE_COLUMN);
        let (Some(ticker_idx), Some(date_idx)) = (ticker_idx, date_idx) else {
            bail!("training data must have '{}' and '{}' columns", TICKER_COLUMN, DATE_COLUMN);
        };

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("bad record at row {}", line + 1))?;
            let ticker = record.get(ticker_idx).unwrap_or_default();
            let date = NaiveDate::parse_from_str(record.get(date_idx).unwrap_or_default(), "%Y-%m-%d")
                .with_context(|| format!("bad date at row {}", line + 1))?;

            let mut entries = Vec::with_capacity(headers.len().saturating_sub(2));
            for (i, name) in headers.iter().enumerate() {
                if i == ticker_idx || i == date_idx {
                    continue;
                }
                let raw = record.get(i).unwrap_or_default();
                let value: f64 = raw
                    .parse()
                    .with_context(|| format!("bad value '{}' for {} at row {}", raw, name, line + 1))?;
                entries.push((name.to_string(), value));
            }
            rows.push(FeatureVector::from_entries(ticker, date, entries));
        }
        Ok(rows)
    }

    pub fn save(rows: &[FeatureVector], path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Self::write_csv(rows, file)?;
        info!("TrainingDataCollector: wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Vec<FeatureVector>> {
        let file =
            std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Self::read_csv(file)
    }
}
