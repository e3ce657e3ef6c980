//! Simulated time
//!
//! Routing state ages against simulated time, never wall-clock time. The
//! host owns a single [`SimClock`] and every node reads it; the clock is
//! only ever advanced by the host between events.

use std::fmt::Display;
use std::ops::{Add, Sub};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A simulated timestamp, in seconds since the start of the run
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of the simulation
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a timestamp from seconds
    ///
    /// Negative and non-finite inputs are clamped to zero.
    pub fn from_secs(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(secs)
        } else {
            Self::ZERO
        }
    }

    /// Seconds since the start of the run
    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is in the future
    pub fn since(&self, earlier: SimTime) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}s", self.0)
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, secs: f64) -> SimTime {
        SimTime::from_secs(self.0 + secs)
    }
}

impl Sub for SimTime {
    type Output = f64;

    fn sub(self, rhs: SimTime) -> f64 {
        self.0 - rhs.0
    }
}

/// Time abstraction for simulated runs
pub trait SimClock: Send + Sync {
    /// Current simulated time
    fn now(&self) -> SimTime;
}

/// Clock advanced explicitly by the host
///
/// Stores the f64 bit pattern in an atomic so one instance can be shared
/// by every node through an `Arc`.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::starting_at(SimTime::ZERO)
    }

    /// Create a clock at the given time
    pub fn starting_at(time: SimTime) -> Self {
        Self {
            bits: AtomicU64::new(time.as_secs().to_bits()),
        }
    }

    /// Move the clock forward by `secs`
    pub fn advance(&self, secs: f64) -> SimTime {
        let next = self.now() + secs.max(0.0);
        self.bits.store(next.as_secs().to_bits(), Ordering::SeqCst);
        next
    }

    /// Jump to `time`; ignored if it would move the clock backwards
    pub fn set(&self, time: SimTime) {
        if time > self.now() {
            self.bits.store(time.as_secs().to_bits(), Ordering::SeqCst);
        }
    }
}

impl SimClock for ManualClock {
    fn now(&self) -> SimTime {
        SimTime(f64::from_bits(self.bits.load(Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_clamps_negative() {
        assert_eq!(SimTime::from_secs(-5.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(3.5).as_secs(), 3.5);
    }

    #[test]
    fn test_since_never_negative() {
        let early = SimTime::from_secs(10.0);
        let late = SimTime::from_secs(25.0);
        assert_eq!(late.since(early), 15.0);
        assert_eq!(early.since(late), 0.0);
    }

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), SimTime::ZERO);

        clock.advance(30.0);
        assert_eq!(clock.now().as_secs(), 30.0);

        clock.set(SimTime::from_secs(10.0));
        assert_eq!(clock.now().as_secs(), 30.0);

        clock.set(SimTime::from_secs(45.0));
        assert_eq!(clock.now().as_secs(), 45.0);

        clock.advance(-3.0);
        assert_eq!(clock.now().as_secs(), 45.0);
    }
}
