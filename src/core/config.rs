//! Configuration for the reset point adjuster.
//!
//! This module provides:
//! - YAML file support
//! - Validation and defaults
//! - A builder for programmatic construction
//!
//! # Choosing `gc_interval`
//!
//! `gc_interval` is both the sweeper period and the inactivity threshold
//! after which a series' tracked state is dropped. It trades memory for
//! accuracy:
//!
//! - Too long, and state for resources that went away lingers in memory.
//! - Too short, and a legitimate gap in reporting that outlasts the interval
//!   evicts the series. The next real point then opens a new epoch exactly
//!   as if the counter had reset upstream, and rates computed across the gap
//!   are lost.
//!
//! Set it to several multiples of the longest scrape interval you expect,
//! plus the longest outage you want to bridge.

use crate::core::{Result, TrueResetError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Strategy name advertised by the true reset point adjuster.
pub const STRATEGY_NAME: &str = "true_reset_point";

/// Complete adjuster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjusterConfig {
    /// Inactivity interval after which unused series state is evicted.
    /// Also the period of the background sweeper.
    #[serde(with = "humantime_serde")]
    pub gc_interval: Duration,
    /// Which resource attributes identify a resource
    pub resource_key: ResourceKeyMode,
    /// Start time adjustment strategy
    pub strategy: AdjustmentStrategy,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// How a resource is keyed in the state registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKeyMode {
    /// `service.name` + `service.instance.id`
    ServiceIdentity,
    /// Every resource attribute
    AllAttributes,
}

/// Start time adjustment strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStrategy {
    /// Keep each epoch's first start time and rewrite later points to it
    TrueResetPoint,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Include targets, thread ids and line numbers
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for AdjusterConfig {
    fn default() -> Self {
        AdjusterConfig {
            gc_interval: Duration::from_secs(600),
            resource_key: ResourceKeyMode::ServiceIdentity,
            strategy: AdjustmentStrategy::TrueResetPoint,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl AdjusterConfig {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = AdjusterConfig::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.gc_interval.is_zero() {
            return Err(TrueResetError::config("gc_interval must be greater than 0"));
        }

        Ok(())
    }
}

impl AdjustmentStrategy {
    /// Name used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentStrategy::TrueResetPoint => STRATEGY_NAME,
        }
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: AdjusterConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: AdjusterConfig::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| TrueResetError::parse(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Load configuration from a YAML file
    pub fn from_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        self.from_yaml(&content)
    }

    /// Set the eviction interval
    pub fn gc_interval(mut self, interval: Duration) -> Self {
        self.config.gc_interval = interval;
        self
    }

    /// Set how resources are keyed
    pub fn resource_key(mut self, mode: ResourceKeyMode) -> Self {
        self.config.resource_key = mode;
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AdjusterConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AdjusterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gc_interval, Duration::from_secs(600));
        assert_eq!(config.resource_key, ResourceKeyMode::ServiceIdentity);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = AdjusterConfig::default();
        config.gc_interval = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .gc_interval(Duration::from_secs(30))
            .resource_key(ResourceKeyMode::AllAttributes)
            .log_level(LogLevel::Debug)
            .build()
            .unwrap();

        assert_eq!(config.gc_interval, Duration::from_secs(30));
        assert_eq!(config.resource_key, ResourceKeyMode::AllAttributes);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        assert!(ConfigBuilder::new().gc_interval(Duration::ZERO).build().is_err());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
gc_interval: 5m
resource_key: all_attributes
strategy: true_reset_point
logging:
  level: debug
  structured: true
"#;

        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();

        assert_eq!(config.gc_interval, Duration::from_secs(300));
        assert_eq!(config.resource_key, ResourceKeyMode::AllAttributes);
        assert_eq!(config.strategy.as_str(), "true_reset_point");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.structured);
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = ConfigBuilder::new()
            .from_yaml("gc_interval: 90s\n")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.gc_interval, Duration::from_secs(90));
        assert_eq!(config.strategy, AdjustmentStrategy::TrueResetPoint);
    }

    #[test]
    fn test_yaml_unknown_strategy() {
        let err = ConfigBuilder::new()
            .from_yaml("strategy: subtract_initial_point\n")
            .err()
            .unwrap();
        assert_eq!(err.category(), "serialization");
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigBuilder::new()
            .from_file("/nonexistent/truereset.yaml")
            .err()
            .unwrap();
        assert_eq!(err.category(), "io");
    }
}
