use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A point in simulation time, measured from the start of the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub Duration);

impl Timestamp {
    /// The start of the simulation.
    pub const ZERO: Self = Self(Duration::ZERO);
    /// The latest representable instant.
    pub const MAX: Self = Self(Duration::MAX);

    /// A timestamp `secs` seconds after the start.
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Panics on negative or non-finite input, like [`Duration::from_secs_f64`].
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::from_secs_f64(secs))
    }

    /// Time elapsed since the simulation started.
    pub fn since_start(&self) -> Duration {
        self.0
    }

    /// Time from `self` until `later`, or zero if `later` is in the past.
    pub fn until(&self, later: Timestamp) -> Duration {
        later.0.saturating_sub(self.0)
    }

    /// Subtract a duration, or `None` if that would precede the start.
    pub fn checked_sub(&self, rhs: Duration) -> Option<Timestamp> {
        self.0.checked_sub(rhs).map(Timestamp)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    /// Saturates at [`Timestamp::MAX`], which no clock reaches.
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    /// Saturates at the simulation start.
    fn sub(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(rhs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}s", self.0.as_secs_f64())
    }
}

/// Anything that can report the current simulation time.
pub trait TimeSource {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Tracks simulation time: a monotonic tick counter and a fixed tick length.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    tick_length: Duration,
}

impl SimClock {
    /// Create a new clock at tick 0 with the given tick length.
    pub fn new(tick_length: Duration) -> Self {
        Self {
            tick: 0,
            tick_length,
        }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Return the current tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Return the configured length of one tick.
    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    /// Simulation time at the start of the given tick.
    pub fn time_at(&self, tick: u64) -> Timestamp {
        // Multiply in nanoseconds; `Duration * u32` would truncate long runs.
        let nanos = self.tick_length.as_nanos().saturating_mul(u128::from(tick));
        let secs = (nanos / 1_000_000_000) as u64;
        let sub = (nanos % 1_000_000_000) as u32;
        Timestamp(Duration::new(secs, sub))
    }
}

impl TimeSource for SimClock {
    fn now(&self) -> Timestamp {
        self.time_at(self.tick)
    }
}

/// A clock pinned to a fixed instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
