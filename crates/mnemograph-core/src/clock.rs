//! # Clock
//!
//! The single source of "now" for every timestamp the store writes.
//! A `Session` owns one clock; tests inject a `ManualClock` to get
//! strictly increasing, reproducible stamps.

use crate::Timestamp;
use chrono::{TimeDelta, Utc};
use std::sync::Mutex;

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(Utc::now())
    }
}

/// A clock that returns a fixed start instant and advances by a fixed step
/// after every reading.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
    step: TimeDelta,
}

impl ManualClock {
    /// Start at `start`, advancing by `step` on every `now()`.
    #[must_use]
    pub fn new(start: Timestamp, step: TimeDelta) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    /// Start at `start`, advancing one second per reading.
    #[must_use]
    pub fn starting_at(start: Timestamp) -> Self {
        Self::new(start, TimeDelta::seconds(1))
    }

    /// The instant the next `now()` will return, without advancing.
    #[must_use]
    pub fn peek(&self) -> Timestamp {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let reading = *current;
        *current = Timestamp::from_datetime(reading.as_datetime() + self.step);
        reading
    }
}
