//! One-way daily circuit breaker.
//!
//! Once tripped, the latch remains tripped for the lifetime of the
//! process. There is no reset path: clearing it requires a session
//! restart.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{error, warn};

use tapeflow_telemetry::metrics::BREAKER_TRIPPED;

/// Reason the breaker tripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerReason {
    /// Daily drawdown limit breached.
    DrawdownBreached {
        /// Realized loss at trip time (positive number of points).
        loss: Decimal,
        /// Configured limit.
        limit: Decimal,
    },
}

impl std::fmt::Display for BreakerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DrawdownBreached { loss, limit } => {
                write!(f, "Daily drawdown breached: {} > {} limit", loss, limit)
            }
        }
    }
}

/// The breaker latch. Thread-safe via `Arc<BreakerLatch>`.
pub struct BreakerLatch {
    tripped: AtomicBool,
    /// Unix ms of the trip, 0 if not tripped.
    tripped_at_ms: AtomicI64,
    reason: RwLock<Option<BreakerReason>>,
}

impl BreakerLatch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tripped: AtomicBool::new(false),
            tripped_at_ms: AtomicI64::new(0),
            reason: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Trip the breaker. If already tripped, this is a no-op that keeps
    /// the original reason.
    pub fn trip(&self, reason: BreakerReason, now_ms: i64) {
        if self
            .tripped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.tripped_at_ms.store(now_ms, Ordering::SeqCst);
            {
                let mut guard = self.reason.write();
                *guard = Some(reason.clone());
            }
            BREAKER_TRIPPED.set(1);
            error!(%reason, "DAILY BREAKER TRIPPED - new entries refused until restart");
        } else {
            warn!(new_reason = %reason, "breaker already tripped, ignoring");
        }
    }

    /// Trip timestamp (Unix ms), if tripped.
    #[must_use]
    pub fn tripped_at_ms(&self) -> Option<i64> {
        if self.is_tripped() {
            let ts = self.tripped_at_ms.load(Ordering::SeqCst);
            if ts > 0 {
                return Some(ts);
            }
        }
        None
    }

    /// The reason for the trip, if tripped.
    #[must_use]
    pub fn reason(&self) -> Option<BreakerReason> {
        if self.is_tripped() {
            self.reason.read().clone()
        } else {
            None
        }
    }
}

impl Default for BreakerLatch {
    fn default() -> Self {
        Self::new()
    }
}
