//! Timer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the timer learns about changes to the backing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Follow the active-entry manager's pushes
    #[default]
    Manager,
    /// Filter broadcast bus messages
    Bus,
}

impl std::str::FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manager" => Ok(Strategy::Manager),
            "bus" => Ok(Strategy::Bus),
            other => Err(ConfigError::Invalid(format!("unknown strategy '{}'", other))),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Manager => write!(f, "manager"),
            Strategy::Bus => write!(f, "bus"),
        }
    }
}

/// Configuration for a timer display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Observation strategy
    pub strategy: Strategy,
    /// Show project and description labels
    pub compact: bool,
    /// Start collapsed
    pub hidden: bool,
    /// Clock resolution in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Manager,
            compact: false,
            hidden: false,
            tick_interval_ms: 1000,
        }
    }
}

impl TimerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: TimerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        // Ticks must land on whole-second boundaries of the elapsed time.
        if 1000 % self.tick_interval_ms != 0 {
            return Err(ConfigError::Invalid(format!(
                "tick_interval_ms must divide 1000, got {}",
                self.tick_interval_ms
            )));
        }
        Ok(())
    }

    /// Set the observation strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set compact mode.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Set hidden mode.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Tick period. Intervals that [`validate`](Self::validate) would
    /// reject fall back to one second.
    pub fn tick_period(&self) -> Duration {
        match self.tick_interval_ms {
            ms @ 1..=1000 if 1000 % ms == 0 => Duration::from_millis(ms),
            _ => Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TimerConfig::default();
        assert_eq!(config.strategy, Strategy::Manager);
        assert_eq!(config.tick_period(), Duration::from_secs(1));
        assert!(!config.compact);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "strategy": "bus", "compact": true }}"#).unwrap();

        let config = TimerConfig::load(file.path()).unwrap();
        assert_eq!(config.strategy, Strategy::Bus);
        assert!(config.compact);
        assert_eq!(config.tick_interval_ms, 1000);
    }

    #[test]
    fn test_load_rejects_zero_interval() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "tick_interval_ms": 0 }}"#).unwrap();

        assert!(matches!(
            TimerConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_interval_must_divide_a_second() {
        let mut config = TimerConfig::default();
        config.tick_interval_ms = 1500;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.tick_interval_ms = 700;
        assert!(config.validate().is_err());

        config.tick_interval_ms = 250;
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_period(), Duration::from_millis(250));
    }

    #[test]
    fn test_unvalidated_interval_ticks_every_second() {
        let mut config = TimerConfig::default();
        config.tick_interval_ms = 1500;
        assert_eq!(config.tick_period(), Duration::from_secs(1));

        config.tick_interval_ms = 0;
        assert_eq!(config.tick_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("BUS".parse::<Strategy>().unwrap(), Strategy::Bus);
        assert!("carrier-pigeon".parse::<Strategy>().is_err());
    }
}
