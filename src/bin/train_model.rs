//! Train the outlier model from a directory of OHLCV CSV files.
//!
//! # Usage
//! ```sh
//! cargo run --bin train_model -- --data-dir data --output models/isolation_forest.json
//! ```
//!
//! # Environment Variables
//! - `MODEL_PATH` - Artifact location when `--output` is not given
//! - `RISKSCOPE_DATA_DIR` - CSV directory when `--data-dir` is not given
//! - `RISKSCOPE_*` - Detection and training tunables

use anyhow::{Context, Result, bail};
use clap::Parser;
use riskscope::application::feature_engineering_service::FeatureEngineer;
use riskscope::application::ml::data_collector::TrainingDataCollector;
use riskscope::application::ml::evaluation::{ScoredRow, evaluate_predictions};
use riskscope::application::ml::{AnomalyPredictor, IsolationForestTrainer, OutlierScorer};
use riskscope::config::Config;
use riskscope::domain::detection::ComponentOutcome;
use riskscope::domain::ports::PriceSeriesSource;
use riskscope::infrastructure::{CsvPriceSeriesSource, JsonModelStore};
use std::path::PathBuf;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of <TICKER>.csv files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Tickers to train on (comma separated). Defaults to every CSV in the directory
    #[arg(short, long)]
    tickers: Option<String>,

    /// Model artifact output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the extracted training rows to this CSV
    #[arg(long)]
    features_out: Option<PathBuf>,

    /// Train from a previously written features CSV instead of price files
    #[arg(long)]
    features_in: Option<PathBuf>,

    /// Number of most important features to report
    #[arg(long, default_value = "10")]
    top_features: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let data_dir = cli.data_dir.unwrap_or(config.model.data_dir.clone());
    let output = cli.output.unwrap_or(config.model.model_path.clone());

    info!("riskscope train_model {} starting", env!("CARGO_PKG_VERSION"));

    let rows = match &cli.features_in {
        Some(path) => TrainingDataCollector::load(path)?,
        None => {
            let source = CsvPriceSeriesSource::new(&data_dir);
            let tickers = match &cli.tickers {
                Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
                None => source.tickers().await?,
            };
            info!("Loading {} tickers from {}", tickers.len(), data_dir.display());

            let mut series = Vec::with_capacity(tickers.len());
            for ticker in &tickers {
                match source.fetch_series(ticker, 0).await {
                    Ok(s) => series.push(s),
                    Err(e) => warn!("Skipping {}: {:#}", ticker, e),
                }
            }

            let collector = TrainingDataCollector::new(FeatureEngineer::new(config.detection.clone()));
            collector.collect(&series)
        }
    };

    if rows.is_empty() {
        bail!("no training rows; need series with at least {} bars", config.detection.min_history());
    }
    if let Some(path) = &cli.features_out {
        TrainingDataCollector::save(&rows, path)?;
    }

    let trainer = IsolationForestTrainer::from_config(&config.detection);
    let scorer = OutlierScorer::train(&trainer, &rows).context("Training failed")?;
    scorer
        .persist(&JsonModelStore::new(&output))
        .context("Failed to write model artifact")?;

    for (rank, (name, shift)) in scorer.feature_importance(cli.top_features).iter().enumerate() {
        info!("  {:>2}. {:<32} {:.5}", rank + 1, name, shift);
    }

    let scored: Vec<ScoredRow> = rows
        .iter()
        .filter_map(|row| match scorer.predict(row) {
            ComponentOutcome::Scored(p) => Some(ScoredRow {
                ticker: row.ticker.clone(),
                date: row.date,
                score: p.score,
                is_anomaly: p.is_anomaly,
            }),
            ComponentOutcome::Unavailable { .. } => None,
        })
        .collect();

    if let Some(summary) = evaluate_predictions(&scored) {
        info!(
            "Training set: {} rows, {} anomalies ({:.1}%), mean score {:.1}, median {:.1}",
            summary.n_total,
            summary.n_anomalies,
            summary.anomaly_rate * 100.0,
            summary.mean_score,
            summary.median_score
        );
        info!(
            "Risk distribution: high {} / medium {} / low {}",
            summary.distribution.high, summary.distribution.medium, summary.distribution.low
        );
        for ticker in summary.by_ticker.iter().take(10) {
            info!(
                "  {:<12} avg {:>5.1}  max {:>5.1}  anomalies {}",
                ticker.ticker, ticker.avg_score, ticker.max_score, ticker.n_anomalies
            );
        }
    }

    info!("Model written to {}", output.display());
    Ok(())
}
