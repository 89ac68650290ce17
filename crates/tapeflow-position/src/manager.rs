//! Authoritative position store and realized PnL aggregation.

use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tapeflow_core::{Instrument, Price, Side, TradeRecord};

use crate::error::{PositionError, PositionResult};

/// An open position for one instrument.
///
/// At most one non-flat position exists per instrument at any time; entry
/// while positioned is refused by the manager, never queued or stacked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: Instrument,
    pub side: Side,
    /// Contracts held; used by risk sizing, not by per-point PnL.
    pub quantity: u32,
    pub entry_price: Price,
    /// Entry timestamp (Unix ms).
    pub entry_ts_ms: i64,
    /// Highest traded price observed since entry.
    pub highest_price_since_entry: Price,
    /// Lowest traded price observed since entry.
    pub lowest_price_since_entry: Price,
}

impl Position {
    pub fn new(
        instrument: Instrument,
        side: Side,
        quantity: u32,
        entry_price: Price,
        entry_ts_ms: i64,
    ) -> Self {
        Self {
            instrument,
            side,
            quantity,
            entry_price,
            entry_ts_ms,
            highest_price_since_entry: entry_price,
            lowest_price_since_entry: entry_price,
        }
    }

    /// Fold a traded price into the since-entry extremes.
    pub fn update_extremes(&mut self, price: Price) {
        self.highest_price_since_entry = self.highest_price_since_entry.max(price);
        self.lowest_price_since_entry = self.lowest_price_since_entry.min(price);
    }

    /// Holding time in milliseconds at `now_ms`.
    pub fn holding_time_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.entry_ts_ms)
    }

    /// Realized PnL in points at `exit_price`.
    pub fn pnl(&self, exit_price: Price) -> Decimal {
        match self.side {
            Side::Long => exit_price.inner() - self.entry_price.inner(),
            Side::Short => self.entry_price.inner() - exit_price.inner(),
        }
    }
}

/// Process-wide daily aggregate statistics. Reset at session start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    #[serde(default)]
    pub trades_taken: u32,
    #[serde(default)]
    pub realized_pnl: Decimal,
}

/// Authoritative store of current positions across instruments.
pub struct PositionManager {
    positions: DashMap<Instrument, Position>,
    records: RwLock<Vec<TradeRecord>>,
    daily: RwLock<DailyStats>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
            records: RwLock::new(Vec::new()),
            daily: RwLock::new(DailyStats::default()),
        }
    }

    /// Current position for an instrument, if one is open.
    pub fn get_position(&self, instrument: &Instrument) -> Option<Position> {
        self.positions.get(instrument).map(|p| p.clone())
    }

    /// Open quantity for an instrument; 0 when flat.
    pub fn open_quantity(&self, instrument: &Instrument) -> u32 {
        self.positions.get(instrument).map(|p| p.quantity).unwrap_or(0)
    }

    /// Open a position. Refused (error, no state change) if a position
    /// already exists for the instrument.
    pub fn open_position(
        &self,
        instrument: Instrument,
        side: Side,
        quantity: u32,
        price: Price,
        ts_ms: i64,
    ) -> PositionResult<Position> {
        use dashmap::mapref::entry::Entry;

        match self.positions.entry(instrument.clone()) {
            Entry::Occupied(_) => Err(PositionError::AlreadyOpen(instrument.0)),
            Entry::Vacant(v) => {
                let position = Position::new(instrument.clone(), side, quantity, price, ts_ms);
                v.insert(position.clone());
                info!(%instrument, %side, %price, quantity, "position opened");
                Ok(position)
            }
        }
    }

    /// Update since-entry extremes from a traded price; returns the
    /// updated position if one is open.
    pub fn update_extremes(&self, instrument: &Instrument, price: Price) -> Option<Position> {
        self.positions.get_mut(instrument).map(|mut p| {
            p.update_extremes(price);
            p.clone()
        })
    }

    /// Close the open position, appending a trade record and folding the
    /// realized PnL into daily stats. Fails if no position is open.
    pub fn close_position(
        &self,
        instrument: &Instrument,
        exit_price: Price,
        ts_ms: i64,
        reason: &str,
    ) -> PositionResult<TradeRecord> {
        let (_, position) = self
            .positions
            .remove(instrument)
            .ok_or_else(|| PositionError::NotOpen(instrument.0.clone()))?;

        let pnl = position.pnl(exit_price);
        let record = TradeRecord {
            instrument: instrument.clone(),
            side: position.side,
            entry_price: position.entry_price,
            entry_ts_ms: position.entry_ts_ms,
            exit_price,
            exit_ts_ms: ts_ms,
            pnl,
            reason: reason.to_string(),
        };

        {
            let mut daily = self.daily.write();
            daily.trades_taken += 1;
            daily.realized_pnl += pnl;
        }
        self.records.write().push(record.clone());

        info!(%instrument, side = %record.side, entry = %record.entry_price,
            exit = %exit_price, %pnl, reason, "position closed");
        debug!(total_pnl = %self.get_total_pnl(), "daily PnL updated");

        Ok(record)
    }

    /// Sum of realized PnL across all trade records this session.
    /// Does not include unrealized PnL of open positions.
    pub fn get_total_pnl(&self) -> Decimal {
        self.daily.read().realized_pnl
    }

    /// Number of trades closed this session.
    pub fn trades_taken(&self) -> u32 {
        self.daily.read().trades_taken
    }

    /// Snapshot of daily stats.
    pub fn daily_stats(&self) -> DailyStats {
        self.daily.read().clone()
    }

    /// All trade records this session, in close order.
    pub fn records_snapshot(&self) -> Vec<TradeRecord> {
        self.records.read().clone()
    }

    /// Snapshot of all open positions.
    pub fn positions_snapshot(&self) -> Vec<Position> {
        self.positions.iter().map(|p| p.clone()).collect()
    }

    /// Restore positions from a snapshot (startup recovery).
    pub fn restore_positions(&self, positions: Vec<Position>) {
        for position in positions {
            self.positions.insert(position.instrument.clone(), position);
        }
    }

    /// Restore daily stats from a snapshot.
    pub fn restore_daily(&self, stats: DailyStats) {
        *self.daily.write() = stats;
    }

    /// Reset daily stats and records at session start.
    ///
    /// Does not touch open positions and does not clear the risk breaker,
    /// which is process-lifetime.
    pub fn reset_daily(&self) {
        *self.daily.write() = DailyStats::default();
        self.records.write().clear();
        info!("daily stats reset");
    }
}

impl Default for PositionManager {
    fn default() -> Self {
        Self::new()
    }
}
