use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Uniform output of every detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorResult {
    pub is_suspicious: bool,
    /// 0-100
    pub score: f64,
    pub message: String,
    pub details: Map<String, Value>,
}

impl DetectorResult {
    pub fn new(is_suspicious: bool, score: f64, message: impl Into<String>) -> Self {
        Self {
            is_suspicious,
            score: score.clamp(0.0, 100.0),
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Non-finite detail values serialize as null.
    pub fn with_number(self, key: &str, value: f64) -> Self {
        let json = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        self.with_detail(key, json)
    }
}

/// Per-component outcome handed to fusion. Fusion matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentOutcome<T> {
    Scored(T),
    Unavailable { reason: String },
}

impl<T> ComponentOutcome<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored(_))
    }

    pub fn as_scored(&self) -> Option<&T> {
        match self {
            Self::Scored(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }
}
