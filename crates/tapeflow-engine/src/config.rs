//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use tapeflow_flow::FlowConfig;
use tapeflow_merge::MergeConfig;
use tapeflow_risk::RiskConfig;

use crate::error::{EngineError, EngineResult};

/// One configured instrument with the intervals its feeds report at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Instrument symbol (e.g., "NIFTY").
    pub symbol: String,
    /// Reporting intervals in seconds; the smallest becomes primary.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: Vec<u32>,
}

fn default_interval_secs() -> Vec<u32> {
    vec![60]
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instruments to track.
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionConfig>,
    /// Merge layer configuration.
    #[serde(default)]
    pub merge: MergeConfig,
    /// Analyzer configuration, shared by all instrument analyzers.
    #[serde(default)]
    pub flow: FlowConfig,
    /// Daily risk limits.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Signal sink queue capacity per receiver. Default: 1024.
    #[serde(default = "default_sink_capacity")]
    pub sink_capacity: usize,
    /// Per-instrument analyzer queue depth. Producers block here rather
    /// than dropping ticks. Default: 1024.
    #[serde(default = "default_analyzer_queue_depth")]
    pub analyzer_queue_depth: usize,
    /// Open-bar net delta that triggers an entry; 0 disables entries
    /// (observation-only run). Default: 50.
    #[serde(default = "default_entry_delta_threshold")]
    pub entry_delta_threshold: i64,
}

fn default_sink_capacity() -> usize {
    1024
}

fn default_analyzer_queue_depth() -> usize {
    1024
}

fn default_entry_delta_threshold() -> i64 {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            merge: MergeConfig::default(),
            flow: FlowConfig::default(),
            risk: RiskConfig::default(),
            sink_capacity: default_sink_capacity(),
            analyzer_queue_depth: default_analyzer_queue_depth(),
            entry_delta_threshold: default_entry_delta_threshold(),
        }
    }
}

impl EngineConfig {
    /// Load configuration: `TAPEFLOW_CONFIG` env var, then
    /// `config/default.toml`, then compiled-in defaults.
    pub fn load() -> EngineResult<Self> {
        let config_path =
            std::env::var("TAPEFLOW_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            warn!(path = %config_path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific TOML file.
    pub fn from_file(path: &str) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("failed to parse config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.subscriptions.is_empty());
        assert_eq!(config.risk.max_trades_per_day, 10);
        assert_eq!(config.merge.min_emit_spacing_ms, 250);
        assert_eq!(config.flow.bar_period_ms, 60_000);
        assert_eq!(config.entry_delta_threshold, 50);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            entry_delta_threshold = 25

            [[subscriptions]]
            symbol = "NIFTY"
            interval_secs = [60, 300]

            [risk]
            max_daily_drawdown = "750"
            "#,
        )
        .unwrap();

        assert_eq!(config.entry_delta_threshold, 25);
        assert_eq!(config.subscriptions.len(), 1);
        assert_eq!(config.subscriptions[0].symbol, "NIFTY");
        assert_eq!(config.subscriptions[0].interval_secs, vec![60, 300]);
        assert_eq!(config.risk.max_daily_drawdown, dec!(750));
        // Untouched sections keep their defaults.
        assert_eq!(config.risk.max_trades_per_day, 10);
        assert_eq!(config.flow.target_points, dec!(10));
    }

    #[test]
    fn test_subscription_default_interval() {
        let config: EngineConfig = toml::from_str(
            r#"
            [[subscriptions]]
            symbol = "ES"
            "#,
        )
        .unwrap();
        assert_eq!(config.subscriptions[0].interval_secs, vec![60]);
    }
}
