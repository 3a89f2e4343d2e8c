#![forbid(unsafe_code)]

//! Trailing-edge debouncer driven by host timestamps.
//!
//! [`Debouncer`] holds at most one pending value. Each [`push`](Debouncer::push)
//! replaces it and restarts the quiet window; [`poll`](Debouncer::poll)
//! releases the value once `now` reaches the deadline.
//!
//! Time is whatever monotonic `Duration` the host passes in, so behaviour is
//! fully deterministic under test and identical on native and `wasm32`.
//!
//! # Invariants
//!
//! 1. Last value wins: a push within the window discards the previous value.
//! 2. A value is released at most once, and only after a full window with no
//!    newer push (`now >= pushed_at + window`).
//! 3. Equal consecutive values are each released (settle, not change,
//!    detection).
//! 4. `cancel` discards the pending value without releasing it.

use std::time::Duration;

/// Quiet window applied when the host does not configure one.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(11);

#[derive(Debug, Clone, PartialEq)]
struct Pending<T> {
    value: T,
    deadline: Duration,
}

/// Single-slot trailing debouncer.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<Pending<T>>,
    released: u64,
    superseded: u64,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            released: 0,
            superseded: 0,
        }
    }

    /// The quiet window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Replace the pending value and restart the window at `now`.
    pub fn push(&mut self, value: T, now: Duration) {
        if self.pending.is_some() {
            self.superseded += 1;
        }
        self.pending = Some(Pending {
            value,
            deadline: now.saturating_add(self.window),
        });
    }

    /// Release the pending value if its window has elapsed at `now`.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match &self.pending {
            Some(p) if now >= p.deadline => {
                self.released += 1;
                self.pending.take().map(|p| p.value)
            }
            _ => None,
        }
    }

    /// Discard the pending value. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// The pending value, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.value)
    }

    /// When the pending value becomes releasable.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Number of values released so far.
    #[must_use]
    pub const fn released(&self) -> u64 {
        self.released
    }

    /// Number of values replaced before their window elapsed.
    #[must_use]
    pub const fn superseded(&self) -> u64 {
        self.superseded
    }
}
