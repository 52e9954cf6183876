//! Testing utilities for Marquee reducers.
//!
//! Provides the [`ReducerTest`] Given-When-Then harness used by every
//! aggregate's unit tests, plus a [`FixedClock`] so order timestamps are
//! deterministic under test.

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

use chrono::{DateTime, Utc};
use marquee_core::environment::Clock;

/// Clock that always returns the same instant.
///
/// Reducer tests pin time with this so assertions on `purchased_at` and
/// `refunded_at` are exact instead of range checks.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Creates a clock frozen at `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }

    /// The instant this clock is frozen at.
    #[must_use]
    pub const fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_advances() {
        let instant = Utc::now();
        let clock = FixedClock::new(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.now(), clock.time());
    }
}
