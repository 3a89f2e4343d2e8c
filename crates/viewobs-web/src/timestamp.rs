#![forbid(unsafe_code)]

use std::time::Duration;

/// Convert an `IntersectionObserverEntry.time` (milliseconds, as a
/// `DOMHighResTimeStamp`) into a `Duration`. Negative or non-finite values
/// map to zero.
#[must_use]
pub fn entry_time(millis: f64) -> Duration {
    Duration::try_from_secs_f64(millis / 1000.0).unwrap_or_default()
}
