use crate::domain::errors::SignalError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse reading of how much social chatter surrounds a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HypeLevel {
    Quiet,
    Normal,
    Elevated,
    Frenzy,
}

impl fmt::Display for HypeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quiet => write!(f, "Quiet"),
            Self::Normal => write!(f, "Normal"),
            Self::Elevated => write!(f, "Elevated"),
            Self::Frenzy => write!(f, "Frenzy"),
        }
    }
}

impl HypeLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::Frenzy,
            s if s >= 60.0 => Self::Elevated,
            s if s >= 25.0 => Self::Normal,
            _ => Self::Quiet,
        }
    }
}

/// Externally supplied social-manipulation score in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialSignal {
    score: f64,
    pub source: String,
}

impl SocialSignal {
    pub fn new(score: f64, source: impl Into<String>) -> Result<Self, SignalError> {
        let source = source.into();
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(SignalError::OutOfRange {
                source_name: source,
                value: score,
            });
        }
        Ok(Self { score, source })
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn hype_level(&self) -> HypeLevel {
        HypeLevel::from_score(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_range() {
        assert!(SocialSignal::new(0.0, "feed").is_ok());
        assert!(SocialSignal::new(100.0, "feed").is_ok());
        assert!(SocialSignal::new(100.5, "feed").is_err());
        assert!(SocialSignal::new(-1.0, "feed").is_err());
        assert!(SocialSignal::new(f64::NAN, "feed").is_err());
    }

    #[test]
    fn test_hype_level_from_score() {
        assert_eq!(HypeLevel::from_score(10.0), HypeLevel::Quiet);
        assert_eq!(HypeLevel::from_score(25.0), HypeLevel::Normal);
        assert_eq!(HypeLevel::from_score(60.0), HypeLevel::Elevated);
        assert_eq!(HypeLevel::from_score(95.0), HypeLevel::Frenzy);
    }
}
