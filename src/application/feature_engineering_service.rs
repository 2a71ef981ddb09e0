use crate::application::market_data::statistical_features::{
    diff, fill_missing, linear_regression_slope, pct_change, rolling_corr, rolling_mean,
    rolling_mean_min_periods, rolling_std, rolling_sum, safe_div,
};
use crate::domain::config::DetectionConfig;
use crate::domain::errors::FeatureError;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ml::feature_registry::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use tracing::debug;

const FLAG_ON: f64 = 1.0;
const FLAG_OFF: f64 = 0.0;

fn flag(condition: bool) -> f64 {
    if condition { FLAG_ON } else { FLAG_OFF }
}

/// Named columns produced by the feature families, keyed by registry name.
#[derive(Default)]
struct Columns {
    by_name: HashMap<&'static str, Vec<f64>>,
}

impl Columns {
    fn put(&mut self, name: &'static str, column: Vec<f64>) {
        self.by_name.insert(name, column);
    }

    /// Applies the missing-value policy and returns columns in registry order.
    fn into_registry_order(mut self) -> Result<Vec<Vec<f64>>, FeatureError> {
        let mut ordered = Vec::with_capacity(FEATURE_COUNT);
        for name in FEATURE_NAMES {
            let mut column = self
                .by_name
                .remove(name)
                .ok_or_else(|| FeatureError::MissingColumn {
                    feature: name.to_string(),
                })?;
            fill_missing(&mut column);
            ordered.push(column);
        }
        Ok(ordered)
    }
}

/// Intermediate series shared by several families.
struct Base<'a> {
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    dates: Vec<NaiveDate>,
    returns: Vec<f64>,
    volume_change: Vec<f64>,
    /// volume / rolling mean volume (window, current bar included)
    volume_ratio: Vec<f64>,
    config: &'a DetectionConfig,
}

impl<'a> Base<'a> {
    fn new(series: &PriceSeries, config: &'a DetectionConfig) -> Self {
        let close = series.closes();
        let volume = series.volumes();
        let returns = pct_change(&close);
        let volume_change = pct_change(&volume);
        let volume_mean = rolling_mean(&volume, config.window_days);
        let volume_ratio = volume
            .iter()
            .zip(&volume_mean)
            .map(|(v, m)| safe_div(*v, *m))
            .collect();

        Self {
            open: series.opens(),
            high: series.highs(),
            low: series.lows(),
            close,
            volume,
            dates: series.dates(),
            returns,
            volume_change,
            volume_ratio,
            config,
        }
    }

    fn len(&self) -> usize {
        self.close.len()
    }

    fn window(&self) -> usize {
        self.config.window_days
    }

    fn prev(column: &[f64], i: usize) -> f64 {
        if i == 0 { f64::NAN } else { column[i - 1] }
    }
}

fn ratio_to_rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mean = rolling_mean(values, window);
    values
        .iter()
        .zip(&mean)
        .map(|(v, m)| safe_div(*v, *m))
        .collect()
}

/// Derives the named feature signals from a price series.
pub struct FeatureEngineer {
    config: DetectionConfig,
}

impl FeatureEngineer {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Feature vector for the most recent bar.
    pub fn extract_latest(&self, series: &PriceSeries) -> Result<FeatureVector, FeatureError> {
        series.require(self.config.min_history())?;
        let columns = self.compute_columns(series)?;
        let last = series.len() - 1;
        self.row(series, &columns, last)
    }

    /// One vector per bar, from the first bar with full history onward.
    pub fn extract_all(&self, series: &PriceSeries) -> Result<Vec<FeatureVector>, FeatureError> {
        let required = self.config.min_history();
        series.require(required)?;
        let columns = self.compute_columns(series)?;
        ((required - 1)..series.len())
            .map(|i| self.row(series, &columns, i))
            .collect()
    }

    fn row(
        &self,
        series: &PriceSeries,
        columns: &[Vec<f64>],
        index: usize,
    ) -> Result<FeatureVector, FeatureError> {
        let mut values = Vec::with_capacity(FEATURE_COUNT);
        for (name, column) in FEATURE_NAMES.iter().zip(columns) {
            let value = column[index];
            if !value.is_finite() {
                return Err(FeatureError::NonFinite {
                    feature: name.to_string(),
                    index,
                });
            }
            values.push(value);
        }
        let date = series.bars()[index].date;
        Ok(FeatureVector::from_registry(series.ticker(), date, &values))
    }

    fn compute_columns(&self, series: &PriceSeries) -> Result<Vec<Vec<f64>>, FeatureError> {
        let base = Base::new(series, &self.config);
        let mut columns = Columns::default();

        volume_price_divergence(&base, &mut columns);
        price_acceleration(&base, &mut columns);
        intraday_patterns(&base, &mut columns);
        multi_day_momentum(&base, &mut columns);
        liquidity(&base, &mut columns);
        price_stability(&base, &mut columns);
        volume_distribution(&base, &mut columns);
        calendar(&base, &mut columns);
        reversal_patterns(&base, &mut columns);

        debug!(
            "FeatureEngineer: computed {} columns over {} bars for {}",
            columns.by_name.len(),
            base.len(),
            series.ticker()
        );
        columns.into_registry_order()
    }
}

fn volume_price_divergence(b: &Base, out: &mut Columns) {
    let n = b.len();
    let correlation = rolling_corr(&b.volume_change, &b.returns, b.window());
    let divergence = correlation
        .iter()
        .map(|c| (1.0 - c).clamp(0.0, 2.0))
        .collect();
    let volume_price_ratio = b
        .volume_ratio
        .iter()
        .zip(&b.returns)
        .map(|(vr, r)| vr / ((r * 100.0).abs() + 1.0))
        .collect();
    let volume_accel = diff(&b.volume_change);
    let price_accel = diff(&b.returns);
    let accel_diff = volume_accel
        .iter()
        .zip(&price_accel)
        .map(|(v, p)| v - p)
        .collect();
    let spike_without_follow_through = (0..n)
        .map(|i| {
            let spiked = b.volume_ratio[i] >= b.config.volume_spike_threshold;
            let held = b.close[i] > Base::prev(&b.close, i);
            flag(i > 0 && spiked && !held)
        })
        .collect();

    out.put("volume_price_correlation", correlation);
    out.put("volume_price_divergence", divergence);
    out.put("volume_price_ratio", volume_price_ratio);
    out.put("volume_acceleration", volume_accel);
    out.put("volume_price_accel_diff", accel_diff);
    out.put("spike_without_follow_through", spike_without_follow_through);
}

fn price_acceleration(b: &Base, out: &mut Columns) {
    let n = b.len();
    let accel = diff(&b.returns);
    let accel_rate = diff(&accel);
    let magnitude = accel.iter().map(|a| a.abs()).collect();
    let mean = rolling_mean(&accel, b.window());
    let std = rolling_std(&accel, b.window());
    let zscore = (0..n).map(|i| safe_div(accel[i] - mean[i], std[i])).collect();
    let reversal = (0..n)
        .map(|i| flag(Base::prev(&accel, i) > 0.0 && accel[i] < 0.0))
        .collect();

    out.put("price_acceleration", accel);
    out.put("price_acceleration_rate", accel_rate);
    out.put("price_accel_magnitude", magnitude);
    out.put("sudden_acceleration_zscore", zscore);
    out.put("acceleration_reversal", reversal);
}

fn intraday_patterns(b: &Base, out: &mut Columns) {
    let n = b.len();
    let range_pct: Vec<f64> = (0..n)
        .map(|i| safe_div(b.high[i] - b.low[i], b.close[i]) * 100.0)
        .collect();
    let range_ratio = ratio_to_rolling_mean(&range_pct, b.window());
    let close_position = (0..n)
        .map(|i| {
            let range = b.high[i] - b.low[i];
            if range <= 0.0 {
                0.5
            } else {
                (b.close[i] - b.low[i]) / range
            }
        })
        .collect();
    let gap: Vec<f64> = (0..n)
        .map(|i| {
            let prev_close = Base::prev(&b.close, i);
            safe_div(b.open[i] - prev_close, prev_close) * 100.0
        })
        .collect();
    let gap_filled = (0..n)
        .map(|i| {
            let prev_close = Base::prev(&b.close, i);
            flag(
                (gap[i] > 0.0 && b.low[i] <= prev_close)
                    || (gap[i] < 0.0 && b.high[i] >= prev_close),
            )
        })
        .collect();

    out.put("intraday_range_pct", range_pct);
    out.put("intraday_range_ratio", range_ratio);
    out.put("close_position_in_range", close_position);
    out.put("gap_pct", gap);
    out.put("gap_filled", gap_filled);
}

fn multi_day_momentum(b: &Base, out: &mut Columns) {
    let n = b.len();
    let cumulative = |bars: usize| -> Vec<f64> {
        (0..n)
            .map(|i| {
                if i < bars {
                    f64::NAN
                } else {
                    safe_div(b.close[i], b.close[i - bars]) - 1.0
                }
            })
            .collect()
    };
    let m3 = cumulative(3);
    let m5 = cumulative(5);
    let change = diff(&m3);

    let threshold = b.config.momentum_reversal_threshold;
    let reversal = (0..n)
        .map(|i| {
            let prev = Base::prev(&m3, i);
            flag(
                (prev > threshold && m3[i] < -threshold)
                    || (prev < -threshold && m3[i] > threshold),
            )
        })
        .collect();

    let signs: Vec<f64> = b
        .returns
        .iter()
        .map(|r| match r {
            r if r.is_nan() => f64::NAN,
            r if *r > 0.0 => 1.0,
            r if *r < 0.0 => -1.0,
            _ => 0.0,
        })
        .collect();
    let consistency = rolling_sum(&signs, 5)
        .iter()
        .map(|s| s.abs() / 5.0)
        .collect();

    let relative_volume = ratio_to_rolling_mean(&b.volume, 5);
    let momentum_volume = (0..n)
        .map(|i| safe_div(m3[i].abs(), relative_volume[i]))
        .collect();

    out.put("momentum_3d", m3);
    out.put("momentum_5d", m5);
    out.put("momentum_change", change);
    out.put("momentum_reversal", reversal);
    out.put("momentum_consistency", consistency);
    out.put("momentum_volume_ratio", momentum_volume);
}

fn liquidity(b: &Base, out: &mut Columns) {
    let n = b.len();
    let volume_to_price: Vec<f64> = (0..n).map(|i| safe_div(b.volume[i], b.close[i])).collect();
    let vtp_vs_avg = ratio_to_rolling_mean(&volume_to_price, b.window());
    let dollar_volume: Vec<f64> = (0..n).map(|i| b.close[i] * b.volume[i]).collect();
    let dollar_volume_ratio = ratio_to_rolling_mean(&dollar_volume, b.window());
    let price_impact: Vec<f64> = (0..n)
        .map(|i| safe_div(b.returns[i].abs(), b.volume_ratio[i]))
        .collect();
    let liquidity_score = price_impact
        .iter()
        .map(|p| {
            if p.is_nan() {
                f64::NAN
            } else {
                1.0 / p.max(1e-3)
            }
        })
        .collect();

    out.put("volume_to_price_ratio", volume_to_price);
    out.put("volume_price_ratio_vs_avg", vtp_vs_avg);
    out.put("dollar_volume", dollar_volume);
    out.put("dollar_volume_ratio", dollar_volume_ratio);
    out.put("price_impact", price_impact);
    out.put("liquidity_score", liquidity_score);
}

fn price_stability(b: &Base, out: &mut Columns) {
    let n = b.len();
    let w = b.window();
    let volatility = rolling_std(&b.returns, w);
    let long_run = rolling_mean_min_periods(&volatility, 2 * w, 1);
    let volatility_ratio = (0..n).map(|i| safe_div(volatility[i], long_run[i])).collect();

    let direction_change: Vec<f64> = (0..n)
        .map(|i| {
            let prev = Base::prev(&b.returns, i);
            if prev.is_nan() || b.returns[i].is_nan() {
                f64::NAN
            } else {
                flag((prev > 0.0) != (b.returns[i] > 0.0))
            }
        })
        .collect();
    let oscillation = rolling_sum(&direction_change, w);

    let stability = volatility
        .iter()
        .map(|v| {
            if v.is_nan() {
                f64::NAN
            } else {
                1.0 / v.max(1e-4)
            }
        })
        .collect();
    let hl_spread: Vec<f64> = (0..n)
        .map(|i| safe_div(b.high[i] - b.low[i], b.close[i]))
        .collect();
    let hl_spread_ratio = ratio_to_rolling_mean(&hl_spread, w);

    out.put("price_volatility", volatility);
    out.put("volatility_ratio", volatility_ratio);
    out.put("price_oscillation", oscillation);
    out.put("price_stability_score", stability);
    out.put("hl_spread", hl_spread);
    out.put("hl_spread_ratio", hl_spread_ratio);
}

fn volume_distribution(b: &Base, out: &mut Columns) {
    let n = b.len();
    let w = b.window();

    let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
    let trend = (0..n)
        .map(|i| {
            if i < 4 {
                return f64::NAN;
            }
            let recent = &b.volume[i - 4..=i];
            let mean = recent.iter().sum::<f64>() / 5.0;
            let slope = linear_regression_slope(&xs, recent).unwrap_or(0.0);
            safe_div(slope, mean)
        })
        .collect();

    let std = rolling_std(&b.volume, w);
    let mean = rolling_mean(&b.volume, w);
    let cv = (0..n).map(|i| safe_div(std[i], mean[i])).collect();

    let threshold = b.config.volume_spike_threshold;
    let mut duration = vec![0.0; n];
    for i in 0..n {
        if b.volume_ratio[i] > threshold {
            duration[i] = if i == 0 { 1.0 } else { duration[i - 1] + 1.0 };
        }
    }

    let deviation = b.volume_ratio.iter().map(|r| (r - 1.0).abs()).collect();

    out.put("volume_trend", trend);
    out.put("volume_cv", cv);
    out.put("volume_spike_duration", duration);
    out.put("volume_mean_deviation", deviation);
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn calendar(b: &Base, out: &mut Columns) {
    let weekday: Vec<f64> = b
        .dates
        .iter()
        .map(|d| f64::from(d.weekday().num_days_from_monday()))
        .collect();
    let is_weekend = weekday.iter().map(|d| flag(*d >= 5.0)).collect();
    let day_of_month = b.dates.iter().map(|d| f64::from(d.day())).collect();
    let month_end = b
        .dates
        .iter()
        .map(|d| flag(d.day() + 3 > days_in_month(*d)))
        .collect();
    let month_beginning = b.dates.iter().map(|d| flag(d.day() <= 3)).collect();

    out.put("day_of_week", weekday);
    out.put("is_weekend", is_weekend);
    out.put("day_of_month", day_of_month);
    out.put("is_month_end", month_end);
    out.put("is_month_beginning", month_beginning);
}

fn reversal_patterns(b: &Base, out: &mut Columns) {
    let n = b.len();
    let close_mean = rolling_mean(&b.close, b.window());

    let mut pattern = vec![0.0; n];
    let mut magnitude = vec![f64::NAN; n];
    let mut pump_dump = vec![0.0; n];
    let mut likelihood = vec![0.0; n];

    for i in 1..n {
        let prev = b.returns[i - 1];
        let curr = b.returns[i];
        pattern[i] = flag(prev > 0.05 && curr < -0.05);
        pump_dump[i] = flag(prev > 0.10 && curr < -0.10);
        magnitude[i] = prev.abs() + curr.abs();

        let stretched = b.close[i - 1] > close_mean[i - 1] && b.close[i] < b.close[i - 1];
        likelihood[i] = 0.4 * pattern[i] + 0.3 * pump_dump[i] + 0.3 * flag(stretched);
    }

    out.put("reversal_pattern", pattern);
    out.put("reversal_magnitude", magnitude);
    out.put("pump_dump_pattern", pump_dump);
    out.put("reversal_likelihood", likelihood);
}
