//! Clock implementations.

use chrono::{DateTime, Utc};

use crate::infrastructure::ports::ClockPort;

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Manually advanced clock for testing.
#[cfg(test)]
pub struct StepClock(parking_lot::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl StepClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(parking_lot::Mutex::new(start))
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock();
        *now += by;
    }
}

#[cfg(test)]
impl ClockPort for StepClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}
