use crate::domain::risk::weights::ComponentWeights;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Extreme => write!(f, "EXTREME"),
        }
    }
}

impl RiskLevel {
    /// Lower-inclusive buckets: [0,30) [30,60) [60,80) [80,100].
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=29 => Self::Low,
            30..=59 => Self::Medium,
            60..=79 => Self::High,
            _ => Self::Extreme,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Extreme => {
                "DO NOT BUY - Extremely high manipulation risk. Likely pump-and-dump in progress."
            }
            Self::High => "AVOID - High risk detected. Wait for more information before investing.",
            Self::Medium => {
                "CAUTION - Moderate risk. Research thoroughly and verify news before investing."
            }
            Self::Low => "NORMAL - No significant manipulation signals detected.",
        }
    }
}

/// Component scores, 0 for components that did not run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub volume: f64,
    pub price: f64,
    pub ml: f64,
    pub social: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlStatus {
    pub enabled: bool,
    pub error: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub ticker: String,
    /// Date of the latest bar scored.
    pub as_of: NaiveDate,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub is_suspicious: bool,
    pub scores: ComponentScores,
    pub weights: ComponentWeights,
    pub red_flags: Vec<String>,
    pub explanation: String,
    pub recommendation: String,
    pub ml_status: MlStatus,
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl RiskAssessment {
    /// Plain-text alert suitable for notifications.
    pub fn alert_summary(&self) -> String {
        let flags = if self.red_flags.is_empty() {
            "  None".to_string()
        } else {
            self.red_flags
                .iter()
                .map(|f| format!("  - {}", f))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "STOCK ALERT: {}\n\nRisk Score: {}/100 ({})\n\n{}\n\nRed Flags:\n{}\n\nRecommendation: {}\n\nAs of: {}",
            self.ticker,
            self.risk_score,
            self.risk_level,
            self.explanation,
            flags,
            self.recommendation,
            self.as_of
        )
    }
}

/// Result of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssessmentOutcome {
    Assessed(RiskAssessment),
    InsufficientData {
        ticker: String,
        reason: String,
        required_bars: usize,
        available_bars: usize,
    },
}

impl AssessmentOutcome {
    pub fn ticker(&self) -> &str {
        match self {
            Self::Assessed(a) => &a.ticker,
            Self::InsufficientData { ticker, .. } => ticker,
        }
    }

    pub fn assessment(&self) -> Option<&RiskAssessment> {
        match self {
            Self::Assessed(a) => Some(a),
            Self::InsufficientData { .. } => None,
        }
    }
}
