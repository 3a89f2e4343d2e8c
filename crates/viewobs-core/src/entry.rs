//! Intersection records delivered by a capability.

use std::time::Duration;

/// One intersection record inside a delivered batch.
///
/// Only `is_intersecting` drives the visibility signal. The ratio and the
/// capability timestamp are carried so raw-callback consumers see the same
/// record the capability produced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntersectionEntry {
    /// Whether the target intersects the root at the configured threshold.
    pub is_intersecting: bool,
    /// Visible fraction of the target, `0.0..=1.0`.
    pub intersection_ratio: f64,
    /// Capability timestamp of the record.
    pub time: Duration,
}

impl IntersectionEntry {
    /// A fully visible record.
    #[must_use]
    pub const fn visible() -> Self {
        Self {
            is_intersecting: true,
            intersection_ratio: 1.0,
            time: Duration::ZERO,
        }
    }

    /// A fully hidden record.
    #[must_use]
    pub const fn hidden() -> Self {
        Self {
            is_intersecting: false,
            intersection_ratio: 0.0,
            time: Duration::ZERO,
        }
    }

    /// Record with an explicit flag and ratio.
    #[must_use]
    pub const fn new(is_intersecting: bool, intersection_ratio: f64) -> Self {
        Self {
            is_intersecting,
            intersection_ratio,
            time: Duration::ZERO,
        }
    }

    /// Set the capability timestamp.
    #[must_use]
    pub const fn at(mut self, time: Duration) -> Self {
        self.time = time;
        self
    }
}

/// The record of a batch whose flag feeds the debouncer.
///
/// The host API delivers records oldest-first and the controller looks at the
/// first one only; `None` for an empty batch.
#[must_use]
pub fn inspected_entry(batch: &[IntersectionEntry]) -> Option<&IntersectionEntry> {
    batch.first()
}
