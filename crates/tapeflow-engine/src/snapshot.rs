//! Versioned engine state snapshot.
//!
//! Captures the state that must survive a restart: open positions, daily
//! stats, and volume baselines. All fields carry serde defaults so a
//! snapshot written by an older build still loads.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tapeflow_core::Instrument;
use tapeflow_merge::IntervalVolumeState;
use tapeflow_position::{DailyStats, Position};

use crate::error::EngineResult;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Per-instrument slice of engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub instrument: Instrument,
    /// Open position, if any.
    #[serde(default)]
    pub position: Option<Position>,
    /// Volume baselines per interval.
    #[serde(default)]
    pub trackers: Vec<IntervalVolumeState>,
}

/// Whole-engine snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub daily: DailyStats,
    #[serde(default)]
    pub instruments: Vec<InstrumentSnapshot>,
}

impl EngineSnapshot {
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}
