#![forbid(unsafe_code)]

//! Host time sources.
//!
//! The observer does not choose its own timeline. Hosts pass `now` into
//! `step`, and the injected [`Clock`] stamps every batch with the moment the
//! capability delivered it, so the debounce window is measured between
//! arrivals rather than between host ticks. Both must read the same
//! timeline; `tick` on the observers steps at the clock's own `now`.
//!
//! - [`HostClock`]: time since construction, on native targets and in the
//!   browser alike (`web_time::Instant` maps to `performance.now()` on
//!   `wasm32`).
//! - [`ManualClock`]: a shared, host-advanced clock for frame-driven hosts
//!   and deterministic tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

/// A monotonic timeline shared by the host and the observer.
pub trait Clock {
    /// Current time on this timeline.
    fn now(&self) -> Duration;
}

/// Elapsed-time source anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    origin: Instant,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock {
    /// Start a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Time elapsed since the clock was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Clock for HostClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock moved only by its owner. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// A clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Move forward by `by` and return the new time.
    pub fn advance(&self, by: Duration) -> Duration {
        let next = self.now.get().saturating_add(by);
        self.now.set(next);
        next
    }

    /// Jump to `at`. Moving backwards is ignored.
    pub fn set(&self, at: Duration) -> Duration {
        let next = self.now.get().max(at);
        self.now.set(next);
        next
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
