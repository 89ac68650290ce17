//! Risk configuration, loaded once at startup and immutable for the session.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Daily risk limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum trades per day before new entries are refused. Default: 10.
    #[serde(default = "default_max_trades_per_day")]
    pub max_trades_per_day: u32,
    /// Daily loss (in points) that trips the breaker. Default: 500.0.
    #[serde(default = "default_max_daily_drawdown")]
    pub max_daily_drawdown: Decimal,
    /// Maximum open quantity per instrument. Default: 10.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: u32,
}

fn default_max_trades_per_day() -> u32 {
    10
}

fn default_max_daily_drawdown() -> Decimal {
    Decimal::from(500)
}

fn default_max_position_size() -> u32 {
    10
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_trades_per_day: default_max_trades_per_day(),
            max_daily_drawdown: default_max_daily_drawdown(),
            max_position_size: default_max_position_size(),
        }
    }
}

impl RiskConfig {
    /// Load from a TOML file, falling back to defaults with a warning on
    /// any failure. Load failure is never fatal.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<RiskConfig>(&raw) {
                Ok(config) => {
                    info!(path = %path.display(), ?config, "risk config loaded");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e,
                        "risk config parse failed, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e,
                    "risk config unreadable, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = RiskConfig::default();
        assert_eq!(config.max_trades_per_day, 10);
        assert_eq!(config.max_daily_drawdown, dec!(500));
        assert_eq!(config.max_position_size, 10);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: RiskConfig = toml::from_str("max_trades_per_day = 3").unwrap();
        assert_eq!(config.max_trades_per_day, 3);
        assert_eq!(config.max_daily_drawdown, dec!(500));
        assert_eq!(config.max_position_size, 10);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = RiskConfig::load_or_default("/nonexistent/risk.toml");
        assert_eq!(config, RiskConfig::default());
    }
}
