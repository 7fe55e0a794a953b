//! # Controller clocks
//!
//! The controller never reads the system clock directly, it asks a [`Clock`]. Time must be
//! monotonic since the PID derivative and integral depend on the time step.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::Cell;
use std::time::Instant;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of monotonic time.
pub trait Clock {
    /// Current time in seconds since an arbitrary fixed origin.
    fn now_s(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Clock backed by `std::time::Instant`, zeroed when created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

/// Clock which only moves when told to. Used by tests and benchmarks.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_s: Cell<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_s(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl ManualClock {
    pub fn new(now_s: f64) -> Self {
        Self {
            now_s: Cell::new(now_s),
        }
    }

    /// Set the current time.
    pub fn set(&self, now_s: f64) {
        self.now_s.set(now_s);
    }

    /// Move the clock forwards.
    pub fn advance(&self, dt_s: f64) {
        self.now_s.set(self.now_s.get() + dt_s);
    }
}

impl Clock for ManualClock {
    fn now_s(&self) -> f64 {
        self.now_s.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_s(&self) -> f64 {
        (**self).now_s()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_monotonic() {
        let clock = MonotonicClock::new();
        let a = clock.now_s();
        let b = clock.now_s();
        assert!(a >= 0.0);
        assert!(b >= a);
    }

    #[test]
    fn test_manual() {
        let clock = ManualClock::new(1.0);
        clock.advance(0.25);
        assert_eq!(clock.now_s(), 1.25);
        clock.set(7.0);
        assert_eq!((&clock).now_s(), 7.0);
    }
}
