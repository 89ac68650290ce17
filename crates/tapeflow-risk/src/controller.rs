//! Entry gating against daily limits.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use tapeflow_core::{Instrument, Side};
use tapeflow_position::PositionManager;
use tapeflow_telemetry::metrics::RISK_REFUSALS_TOTAL;

use crate::breaker::{BreakerLatch, BreakerReason};
use crate::config::RiskConfig;

/// Gates new entries against the daily limits; owns the one-way breaker.
///
/// Refusal is a normal outcome, not an error. Closing an existing position
/// is a separate path upstream and is never gated here.
pub struct RiskController {
    config: RiskConfig,
    positions: Arc<PositionManager>,
    breaker: Arc<BreakerLatch>,
}

impl RiskController {
    pub fn new(config: RiskConfig, positions: Arc<PositionManager>) -> Self {
        Self {
            config,
            positions,
            breaker: Arc::new(BreakerLatch::new()),
        }
    }

    /// Whether a new trade is permitted, evaluated in fixed rule order:
    ///
    /// 1. breaker already tripped → refuse unconditionally
    /// 2. daily trade count at cap → refuse
    /// 3. realized loss beyond the drawdown limit → trip the breaker, refuse
    /// 4. opposite side to an existing position → allow (size-reducing)
    /// 5. position-size cap → refuse when exceeded
    pub fn can_trade(&self, side: Side, instrument: &Instrument, quantity: u32) -> bool {
        if self.breaker.is_tripped() {
            self.refuse(instrument, "breaker");
            return false;
        }

        if self.positions.trades_taken() >= self.config.max_trades_per_day {
            self.refuse(instrument, "trade_count");
            debug!(%instrument, trades = self.positions.trades_taken(),
                cap = self.config.max_trades_per_day, "daily trade cap reached");
            return false;
        }

        if self.drawdown_breached() {
            self.refuse(instrument, "drawdown");
            return false;
        }

        if let Some(position) = self.positions.get_position(instrument) {
            if position.side == side.opposite() {
                // Opposite-side request reduces existing risk; never blocked
                // by size checks.
                return true;
            }
        }

        let current_quantity = self.positions.open_quantity(instrument);
        if current_quantity + quantity > self.config.max_position_size {
            self.refuse(instrument, "position_size");
            debug!(%instrument, current_quantity, quantity,
                cap = self.config.max_position_size, "position size cap reached");
            return false;
        }

        true
    }

    /// Idempotent drawdown re-check for callers that poll outside the
    /// entry path. Returns true while trading remains permitted.
    pub fn check_risk_status(&self) -> bool {
        if self.breaker.is_tripped() {
            return false;
        }
        !self.drawdown_breached()
    }

    /// Rule 3: trip the latch when realized loss exceeds the daily limit.
    fn drawdown_breached(&self) -> bool {
        let pnl = self.positions.get_total_pnl();
        if pnl < Decimal::ZERO && pnl.abs() > self.config.max_daily_drawdown {
            warn!(%pnl, limit = %self.config.max_daily_drawdown, "daily drawdown breached");
            self.breaker.trip(
                BreakerReason::DrawdownBreached {
                    loss: pnl.abs(),
                    limit: self.config.max_daily_drawdown,
                },
                Utc::now().timestamp_millis(),
            );
            return true;
        }
        false
    }

    fn refuse(&self, instrument: &Instrument, rule: &str) {
        RISK_REFUSALS_TOTAL
            .with_label_values(&[instrument.as_str(), rule])
            .inc();
    }

    pub fn breaker(&self) -> &Arc<BreakerLatch> {
        &self.breaker
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}
