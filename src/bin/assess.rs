//! Score tickers from a directory of OHLCV CSV files.
//!
//! Prints one JSON object per ticker to stdout, in the order requested. Files
//! that cannot be read or hold invalid bars produce an `insufficient_data` line.
//!
//! # Usage
//! ```sh
//! cargo run --bin assess -- --tickers ABC,XYZ --social ABC=75
//! ```
//!
//! # Environment Variables
//! - `MODEL_PATH` - Model artifact; a missing or unreadable artifact disables the ML component
//! - `RISKSCOPE_DATA_DIR` - CSV directory when `--data-dir` is not given
//! - `RISKSCOPE_*` - Detection tunables

use anyhow::{Context, Result};
use clap::Parser;
use riskscope::application::bootstrap::ModelHandle;
use riskscope::application::risk_management::{RiskEngine, high_risk};
use riskscope::config::Config;
use riskscope::domain::ports::SocialSignalSource;
use riskscope::domain::risk::assessment::AssessmentOutcome;
use riskscope::infrastructure::{CsvPriceSeriesSource, JsonModelStore, StaticSocialSignalSource};
use std::path::PathBuf;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of <TICKER>.csv files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Tickers to score (comma separated). Defaults to every CSV in the directory
    #[arg(short, long)]
    tickers: Option<String>,

    /// Model artifact path
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Social scores as TICKER=SCORE (comma separated)
    #[arg(long)]
    social: Option<String>,

    /// Bars to read per ticker, 0 for the whole file
    #[arg(long, default_value = "0")]
    lookback: usize,

    /// Print an alert for every ticker scoring at or above this value
    #[arg(long, default_value = "60")]
    alert_threshold: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let data_dir = cli.data_dir.unwrap_or(config.model.data_dir.clone());
    let model_path = cli.model.unwrap_or(config.model.model_path.clone());

    let store = JsonModelStore::new(&model_path);
    let handle = ModelHandle::new();
    let engine = RiskEngine::new(config.detection.clone(), handle.predictor(&store))
        .context("Invalid detection configuration")?;

    let social = match &cli.social {
        Some(pairs) => StaticSocialSignalSource::from_pairs(pairs.split(','), "cli")?,
        None => StaticSocialSignalSource::new(),
    };

    let source = CsvPriceSeriesSource::new(&data_dir);
    let tickers: Vec<String> = match &cli.tickers {
        Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
        None => source.tickers().await?,
    };

    let mut items = Vec::with_capacity(tickers.len());
    let mut unreadable = Vec::new();
    for (position, ticker) in tickers.iter().enumerate() {
        let signal = social.fetch_signal(ticker).await?;
        match source.fetch_bars(ticker, cli.lookback).await {
            Ok(bars) => items.push((ticker.clone(), bars, signal)),
            Err(e) => {
                warn!("Cannot read {}: {:#}", ticker, e);
                unreadable.push((
                    position,
                    AssessmentOutcome::InsufficientData {
                        ticker: ticker.clone(),
                        reason: format!("{:#}", e),
                        required_bars: engine.config().min_history(),
                        available_bars: 0,
                    },
                ));
            }
        }
    }

    let mut outcomes = engine.assess_bars_batch(items);
    for (position, outcome) in unreadable {
        outcomes.insert(position, outcome);
    }
    for outcome in &outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }

    let flagged = high_risk(&outcomes, cli.alert_threshold);
    info!(
        "{} of {} tickers at or above {}",
        flagged.len(),
        outcomes.len(),
        cli.alert_threshold
    );
    for assessment in flagged {
        eprintln!("{}\n", assessment.alert_summary());
    }

    Ok(())
}
