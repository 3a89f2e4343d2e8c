#![forbid(unsafe_code)]

//! JSONL scenario log.
//!
//! Each line is one object with an `"event"` key. Tests print the log on
//! failure; nothing parses it back except the tests of this module.

use std::fmt::Write as _;
use std::time::Duration;

use serde_json::{Value, json};
use viewobs_runtime::StepResult;

/// Append-only scenario log.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    lines: Vec<Value>,
}

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch handed to the capability sink.
    pub fn fired(&mut self, at: Duration, generation: u64, intersecting: &[bool]) {
        self.lines.push(json!({
            "event": "fire",
            "at_ms": millis(at),
            "generation": generation,
            "intersecting": intersecting,
        }));
    }

    /// A reconfiguration.
    pub fn configured(&mut self, at: Duration, generation: u64, root: &str) {
        self.lines.push(json!({
            "event": "configure",
            "at_ms": millis(at),
            "generation": generation,
            "root": root,
        }));
    }

    /// One observer step.
    pub fn stepped(&mut self, at: Duration, result: &StepResult) {
        self.lines.push(json!({
            "event": "step",
            "at_ms": millis(at),
            "batches": result.batches_processed,
            "emissions": result.emissions,
            "last_emitted": result.last_emitted,
        }));
    }

    /// Teardown.
    pub fn destroyed(&mut self, at: Duration) {
        self.lines.push(json!({ "event": "destroy", "at_ms": millis(at) }));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Events with the given `"event"` name.
    pub fn events<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.lines.iter().filter(move |line| line["event"] == name)
    }

    /// One JSON object per line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            let _ = writeln!(out, "{line}");
        }
        out
    }
}

fn millis(at: Duration) -> u64 {
    u64::try_from(at.as_millis()).unwrap_or(u64::MAX)
}
