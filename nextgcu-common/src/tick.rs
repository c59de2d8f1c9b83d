//! Tick clock shared by the control-plane timers
//!
//! Procedure deadlines are expressed in ticks rather than wall-clock time, so
//! timeouts advance only when the owning context processes a `Tick` event.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tick counter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(u64);

impl Tick {
    /// Creates a new tick
    pub fn new(tick: u64) -> Self {
        Self(tick)
    }

    /// Creates the initial tick (tick 0)
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the tick value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns a tick advanced by N ticks without mutating
    pub fn advanced_by(&self, n: u64) -> Self {
        Self(self.0.saturating_add(n))
    }

    /// Calculates the difference between two ticks
    pub fn diff(&self, other: &Tick) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

impl From<u64> for Tick {
    fn from(tick: u64) -> Self {
        Self::new(tick)
    }
}

/// Monotonic tick clock.
#[derive(Debug, Clone, Default)]
pub struct TickClock {
    now: u64,
}

impl TickClock {
    /// Creates a clock at tick 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current tick
    pub fn now(&self) -> Tick {
        Tick(self.now)
    }

    /// Advances the clock by one tick and returns the new value
    pub fn advance(&mut self) -> Tick {
        self.now = self.now.saturating_add(1);
        Tick(self.now)
    }

    /// Returns the deadline `ticks` from now
    pub fn deadline_in(&self, ticks: u64) -> Tick {
        self.now().advanced_by(ticks)
    }

    /// Returns true if the given deadline has been reached
    pub fn has_reached(&self, deadline: Tick) -> bool {
        self.now() >= deadline
    }
}

/// Converts a tick period in milliseconds into a `Duration`
pub fn tick_duration(tick_duration_ms: u64) -> Duration {
    Duration::from_millis(tick_duration_ms)
}
