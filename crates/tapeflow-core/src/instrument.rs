//! Instrument, interval, and feed-source identification.
//!
//! An instrument is tracked across multiple upstream sources, each of which
//! may report at a different aggregation interval. The *primary* interval
//! for an instrument is the numerically smallest subscribed one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument identifier (e.g., "NIFTY", "ES", "BTC-PERP").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(pub String);

impl Instrument {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Instrument {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Aggregation interval of an upstream source, in seconds.
///
/// Ordering is numeric: `Interval(60) < Interval(300)`, so the finest
/// granularity is the minimum of a subscription set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interval(pub u32);

impl Interval {
    /// One-minute interval.
    pub const MIN_1: Self = Self(60);
    /// Five-minute interval.
    pub const MIN_5: Self = Self(300);

    pub fn new(secs: u32) -> Self {
        Self(secs)
    }

    pub fn secs(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 60 == 0 && self.0 > 0 {
            write!(f, "{}m", self.0 / 60)
        } else {
            write!(f, "{}s", self.0)
        }
    }
}

/// Upstream provider identifier (e.g., "dhan", "kite").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedSource(pub String);

impl FeedSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeedSource {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
