use crate::domain::ports::SocialSignalSource;
use crate::domain::sentiment::SocialSignal;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Social scores supplied up front, e.g. from a CLI flag or a fixture.
#[derive(Debug, Clone, Default)]
pub struct StaticSocialSignalSource {
    signals: HashMap<String, SocialSignal>,
}

impl StaticSocialSignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, ticker: impl Into<String>, signal: SocialSignal) -> Self {
        self.signals.insert(ticker.into(), signal);
        self
    }

    /// Parses `TICKER=SCORE` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>, source: &str) -> Result<Self> {
        let mut signals = HashMap::new();
        for pair in pairs {
            let (ticker, score) = pair
                .split_once('=')
                .with_context(|| format!("expected TICKER=SCORE, got '{}'", pair))?;
            let score: f64 = score
                .trim()
                .parse()
                .with_context(|| format!("bad social score in '{}'", pair))?;
            signals.insert(ticker.trim().to_string(), SocialSignal::new(score, source)?);
        }
        Ok(Self { signals })
    }

    pub fn get(&self, ticker: &str) -> Option<&SocialSignal> {
        self.signals.get(ticker)
    }
}

#[async_trait]
impl SocialSignalSource for StaticSocialSignalSource {
    async fn fetch_signal(&self, ticker: &str) -> Result<Option<SocialSignal>> {
        Ok(self.signals.get(ticker).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_and_unknown_tickers() {
        let source =
            StaticSocialSignalSource::from_pairs(["ABC=72.5", " XYZ = 10 "], "cli").unwrap();

        let abc = source.fetch_signal("ABC").await.unwrap().unwrap();
        assert_eq!(abc.score(), 72.5);
        assert_eq!(abc.source, "cli");
        assert!(source.fetch_signal("XYZ").await.unwrap().is_some());
        assert!(source.fetch_signal("NONE").await.unwrap().is_none());
    }

    #[test]
    fn test_rejects_bad_pairs() {
        assert!(StaticSocialSignalSource::from_pairs(["ABC=140"], "cli").is_err());
        assert!(StaticSocialSignalSource::from_pairs(["ABC"], "cli").is_err());
    }
}
