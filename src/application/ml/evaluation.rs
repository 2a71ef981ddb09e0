use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One scored training or backtest row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub score: f64,
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskDistribution {
    /// score >= 60
    pub high: usize,
    /// 30 <= score < 60
    pub medium: usize,
    /// score < 30
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub avg_score: f64,
    pub max_score: f64,
    pub n_anomalies: usize,
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub n_total: usize,
    pub n_anomalies: usize,
    pub anomaly_rate: f64,
    pub mean_score: f64,
    pub median_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub distribution: RiskDistribution,
    /// Sorted by average score, highest first
    pub by_ticker: Vec<TickerSummary>,
}

/// Summarizes model output over many rows. Returns `None` for an empty input.
pub fn evaluate_predictions(rows: &[ScoredRow]) -> Option<EvaluationSummary> {
    if rows.is_empty() {
        return None;
    }

    let n_total = rows.len();
    let n_anomalies = rows.iter().filter(|r| r.is_anomaly).count();

    let mut scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
    scores.sort_by(|a, b| a.total_cmp(b));
    let median_score = if n_total % 2 == 0 {
        (scores[n_total / 2 - 1] + scores[n_total / 2]) / 2.0
    } else {
        scores[n_total / 2]
    };

    let mut distribution = RiskDistribution::default();
    for score in &scores {
        match *score {
            s if s >= 60.0 => distribution.high += 1,
            s if s >= 30.0 => distribution.medium += 1,
            _ => distribution.low += 1,
        }
    }

    let mut grouped: BTreeMap<&str, Vec<&ScoredRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.ticker.as_str()).or_default().push(row);
    }
    let mut by_ticker: Vec<TickerSummary> = grouped
        .into_iter()
        .map(|(ticker, group)| TickerSummary {
            ticker: ticker.to_string(),
            avg_score: group.iter().map(|r| r.score).sum::<f64>() / group.len() as f64,
            max_score: group.iter().map(|r| r.score).fold(f64::MIN, f64::max),
            n_anomalies: group.iter().filter(|r| r.is_anomaly).count(),
            n_samples: group.len(),
        })
        .collect();
    by_ticker.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));

    Some(EvaluationSummary {
        n_total,
        n_anomalies,
        anomaly_rate: n_anomalies as f64 / n_total as f64,
        mean_score: scores.iter().sum::<f64>() / n_total as f64,
        median_score,
        min_score: scores[0],
        max_score: scores[n_total - 1],
        distribution,
        by_ticker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ticker: &str, day: u32, score: f64, is_anomaly: bool) -> ScoredRow {
        ScoredRow {
            ticker: ticker.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            score,
            is_anomaly,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(evaluate_predictions(&[]).is_none());
    }

    #[test]
    fn test_summary_buckets_and_rates() {
        let rows = vec![
            row("AAA", 1, 10.0, false),
            row("AAA", 2, 30.0, false),
            row("BBB", 1, 60.0, true),
            row("BBB", 2, 90.0, true),
        ];
        let summary = evaluate_predictions(&rows).unwrap();

        assert_eq!(summary.n_total, 4);
        assert_eq!(summary.n_anomalies, 2);
        assert_eq!(summary.anomaly_rate, 0.5);
        assert_eq!(summary.median_score, 45.0);
        assert_eq!(
            summary.distribution,
            RiskDistribution {
                high: 2,
                medium: 1,
                low: 1
            }
        );
        assert_eq!(summary.by_ticker[0].ticker, "BBB");
        assert_eq!(summary.by_ticker[0].avg_score, 75.0);
        assert_eq!(summary.by_ticker[0].n_anomalies, 2);
        assert_eq!(summary.by_ticker[1].max_score, 30.0);
    }
}
