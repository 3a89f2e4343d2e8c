//! Property tests for the observer lifecycle.
//!
//! Arbitrary interleavings of input changes, timed capability deliveries,
//! host steps, and teardown are checked against a reference model:
//!
//! 1. At most one capability handle is alive at any instant.
//! 2. Every created handle is disposed exactly once by the time the observer
//!    is dropped.
//! 3. A delivered value is emitted iff no later accepted delivery arrived
//!    within 11ms of it and the host stepped at or past its deadline before
//!    teardown. Emissions keep arrival order.
//! 4. How often the host steps changes when values are emitted, never which.

use std::time::Duration;

use proptest::prelude::*;
use viewobs_core::dom::NodeRef;
use viewobs_core::{Platform, RootMargin, Threshold};
use viewobs_harness::{EmissionRecorder, Fixture, ManualClock, MockIntersectionSource};
use viewobs_runtime::{RuntimeConfig, ViewObserver};

const WINDOW: Duration = Duration::from_millis(11);
const THRESHOLDS: [f64; 3] = [0.0, 0.1, 1.0];
const MARGINS: [&str; 3] = ["0px", "8px", "-4px 0px"];
const SELECTORS: [Option<&str>; 4] = [None, Some(".ancestor"), Some(".missing"), Some("")];

#[derive(Debug, Clone)]
enum Op {
    Threshold(usize),
    Margin(usize),
    Selector(usize),
    Target(bool),
    /// Advance the clock by `after` ms, then deliver `value`.
    Fire { value: bool, after: u8 },
    /// Advance the clock by `after` ms, then step.
    Step { after: u8 },
    Destroy,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => (0..THRESHOLDS.len()).prop_map(Op::Threshold),
        1 => (0..MARGINS.len()).prop_map(Op::Margin),
        1 => (0..SELECTORS.len()).prop_map(Op::Selector),
        1 => any::<bool>().prop_map(Op::Target),
        4 => (any::<bool>(), 0u8..20).prop_map(|(value, after)| Op::Fire { value, after }),
        4 => (0u8..20).prop_map(|after| Op::Step { after }),
        1 => Just(Op::Destroy),
    ]
}

/// What the consumer should observe, derived from arrival times alone.
#[derive(Debug)]
struct Model {
    threshold: usize,
    margin: usize,
    selector: usize,
    sibling: bool,
    dirty: bool,
    observing: bool,
    destroyed: bool,
    /// Delivered to the live handle, not yet drained.
    in_flight: Vec<(bool, Duration)>,
    /// Drained by a step that did not replace the handle first.
    accepted: Vec<(bool, Duration)>,
    /// Times of every step taken before teardown.
    steps: Vec<Duration>,
}

impl Model {
    fn new() -> Self {
        Self {
            threshold: 1,
            margin: 0,
            selector: 0,
            sibling: false,
            dirty: true,
            observing: false,
            destroyed: false,
            in_flight: Vec::new(),
            accepted: Vec::new(),
            steps: Vec::new(),
        }
    }

    fn change(slot: &mut usize, to: usize, dirty: &mut bool) {
        if *slot != to {
            *slot = to;
            *dirty = true;
        }
    }

    fn fire(&mut self, value: bool, at: Duration) {
        if self.observing && !self.destroyed {
            self.in_flight.push((value, at));
        }
    }

    fn step(&mut self, now: Duration) {
        if self.destroyed {
            return;
        }
        if self.dirty {
            // The old handle's undrained deliveries are stale.
            self.dirty = false;
            self.observing = true;
            self.in_flight.clear();
        }
        self.accepted.append(&mut self.in_flight);
        self.steps.push(now);
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.in_flight.clear();
    }

    fn expected(&self) -> Vec<bool> {
        let last_step = self.steps.iter().max().copied();
        self.accepted
            .iter()
            .enumerate()
            .filter(|&(i, &(_, at))| {
                let deadline = at + WINDOW;
                let superseded = self
                    .accepted
                    .get(i + 1)
                    .is_some_and(|&(_, next)| next < deadline);
                !superseded && last_step.is_some_and(|step| step >= deadline)
            })
            .map(|(_, &(value, _))| value)
            .collect()
    }
}

fn timed_observer(
    fixture: &Fixture,
    source: &MockIntersectionSource,
    clock: &ManualClock,
) -> ViewObserver<NodeRef, MockIntersectionSource> {
    ViewObserver::with_clock(
        fixture.target.clone(),
        source.clone(),
        Platform::Browser,
        &RuntimeConfig::default(),
        clock.clone(),
    )
}

proptest! {
    #[test]
    fn observer_matches_model(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let fixture = Fixture::new();
        let sibling = fixture.sibling();
        let source = MockIntersectionSource::new();
        let clock = ManualClock::new();
        let mut observer = timed_observer(&fixture, &source, &clock);
        let emissions = EmissionRecorder::attach(observer.visible_change());
        let mut model = Model::new();

        for op in &ops {
            match *op {
                Op::Threshold(i) => {
                    observer.threshold().set(Threshold::Single(THRESHOLDS[i]));
                    if !model.destroyed {
                        Model::change(&mut model.threshold, i, &mut model.dirty);
                    }
                }
                Op::Margin(i) => {
                    observer.root_margin().set(RootMargin::new(MARGINS[i]));
                    if !model.destroyed {
                        Model::change(&mut model.margin, i, &mut model.dirty);
                    }
                }
                Op::Selector(i) => {
                    observer.ancestor_selector().set(SELECTORS[i].map(str::to_owned));
                    if !model.destroyed {
                        Model::change(&mut model.selector, i, &mut model.dirty);
                    }
                }
                Op::Target(to_sibling) => {
                    let target = if to_sibling { sibling.clone() } else { fixture.target.clone() };
                    observer.target().set(target);
                    if !model.destroyed && model.sibling != to_sibling {
                        model.sibling = to_sibling;
                        model.dirty = true;
                    }
                }
                Op::Fire { value, after } => {
                    let at = clock.advance(Duration::from_millis(u64::from(after)));
                    source.fire_intersecting(value);
                    model.fire(value, at);
                }
                Op::Step { after } => {
                    let now = clock.advance(Duration::from_millis(u64::from(after)));
                    observer.step(now);
                    model.step(now);
                }
                Op::Destroy => {
                    observer.destroy();
                    model.destroy();
                }
            }
            prop_assert!(source.alive() <= 1);
        }

        prop_assert!(source.max_alive() <= 1);
        prop_assert_eq!(emissions.values(), model.expected());

        drop(observer);
        prop_assert_eq!(source.alive(), 0);
        let mut disposed = source.disposed();
        prop_assert_eq!(disposed.len(), source.create_count());
        disposed.dedup();
        prop_assert_eq!(disposed.len(), source.create_count());
    }

    #[test]
    fn step_cadence_does_not_change_emissions(
        deliveries in proptest::collection::vec((any::<bool>(), 0u64..25), 1..30),
        frame in 2u64..40,
    ) {
        let fixture = Fixture::new();
        let (fine_source, coarse_source) = (MockIntersectionSource::new(), MockIntersectionSource::new());
        let clock = ManualClock::new();
        let mut fine = timed_observer(&fixture, &fine_source, &clock);
        let mut coarse = timed_observer(&fixture, &coarse_source, &clock);
        let fine_out = EmissionRecorder::attach(fine.visible_change());
        let coarse_out = EmissionRecorder::attach(coarse.visible_change());

        fine.step(clock.now());
        coarse.step(clock.now());

        let mut schedule = Vec::new();
        let mut at = 0;
        for &(value, gap) in &deliveries {
            at += gap;
            schedule.push((at, value));
        }
        let end = at + 2 * frame + WINDOW.as_millis() as u64;

        let mut next = schedule.iter().peekable();
        for t in 0..=end {
            let now = clock.set(Duration::from_millis(t));
            while let Some(&(_, value)) = next.next_if(|&&(when, _)| when == t) {
                fine_source.fire_intersecting(value);
                coarse_source.fire_intersecting(value);
            }
            fine.step(now);
            if t % frame == 0 {
                coarse.step(now);
            }
        }
        coarse.step(clock.now());

        prop_assert_eq!(coarse_out.values(), fine_out.values());
    }
}
