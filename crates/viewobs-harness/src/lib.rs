#![forbid(unsafe_code)]

//! Test harness for viewobs.
//!
//! - [`MockIntersectionSource`]: a scriptable capability that records every
//!   create and dispose and lets tests fire batches at will.
//! - [`EmissionRecorder`] and [`BatchRecorder`]: capture what the observer
//!   emits and what its raw callback receives.
//! - [`Fixture`]: a small element tree plus a manual clock, enough to drive
//!   an observer through a scenario step by step.
//! - [`Timeline`]: a JSONL log of a scenario, for readable failure output.

pub mod fixture;
pub mod mock;
pub mod recorder;
pub mod timeline;

pub use fixture::{Fixture, ManualClock, ms};
pub use mock::{CreateRecord, MockHandle, MockIntersectionSource};
pub use recorder::{BatchRecorder, EmissionRecorder, RecordedBatch};
pub use timeline::Timeline;
