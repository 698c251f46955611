use crate::error::{CoreError, Result};
use crate::types::Amount;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signed offset for deadline arithmetic. Fails for spans chrono cannot represent.
pub fn span_offset(span: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(span)
        .map_err(|e| CoreError::config(format!("Span {:?} out of range: {}", span, e)))
}

/// Arena parameters fixed when the arena is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Minimum stake accepted with a commitment.
    pub fixed_bet: Amount,
    /// Time both players get to reveal once the second commitment lands.
    pub reveal_span: Duration,
    /// When set, a match that has not collected both commitments this long
    /// after pairing can be settled as a refund.
    #[serde(default)]
    pub commit_span: Option<Duration>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            fixed_bet: Amount::from_units(1),
            reveal_span: Duration::from_secs(300), // 5 minutes
            commit_span: None,
        }
    }
}

impl ArenaConfig {
    pub fn new(fixed_bet: Amount, reveal_span: Duration) -> Self {
        Self {
            fixed_bet,
            reveal_span,
            commit_span: None,
        }
    }

    pub fn with_commit_span(mut self, commit_span: Duration) -> Self {
        self.commit_span = Some(commit_span);
        self
    }

    pub fn reveal_offset(&self) -> Result<chrono::Duration> {
        span_offset(self.reveal_span)
    }

    pub fn commit_offset(&self) -> Result<Option<chrono::Duration>> {
        self.commit_span.map(span_offset).transpose()
    }

    pub fn validate(&self) -> Result<()> {
        if self.fixed_bet == Amount::ZERO {
            return Err(CoreError::config("Fixed bet must be greater than 0"));
        }

        if self.reveal_span.is_zero() {
            return Err(CoreError::config("Reveal span must be greater than 0"));
        }

        if matches!(self.commit_span, Some(span) if span.is_zero()) {
            return Err(CoreError::config("Commit span must be greater than 0"));
        }

        self.reveal_offset()?;
        self.commit_offset()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ArenaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reveal_offset().unwrap(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_span_offset_rejects_unrepresentable_spans() {
        assert_eq!(
            span_offset(Duration::from_secs(90)).unwrap(),
            chrono::Duration::seconds(90)
        );
        assert!(matches!(
            span_offset(Duration::MAX),
            Err(CoreError::Config(_))
        ));

        let config = ArenaConfig::new(Amount::from_units(1), Duration::MAX);
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_values() {
        let config = ArenaConfig::new(Amount::ZERO, Duration::from_secs(5));
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = ArenaConfig::new(Amount::from_units(1), Duration::ZERO);
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = ArenaConfig::default().with_commit_span(Duration::ZERO);
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_commit_span_is_optional_in_json() {
        let json = r#"{"fixed_bet":2,"reveal_span":{"secs":5,"nanos":0}}"#;
        let config: ArenaConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.fixed_bet, Amount::from_units(2));
        assert_eq!(config.commit_span, None);
    }
}
