#![forbid(unsafe_code)]

//! Visibility observer state machine.
//!
//! [`VisibilityObserver`] owns at most one capability handle for one target
//! and turns the batches it delivers into a debounced `bool` stream.
//!
//! # States
//!
//! ```text
//! Uninitialized ──configure──▶ Observing ◀──┐
//!       │                        │          │ (create done)
//!       │                        └configure▶ Reconfiguring
//!       │                        │
//!       └────────teardown────────┴──────────▶ Disposed (terminal)
//! ```
//!
//! # Reconfiguration
//!
//! 1. Skip entirely when the injected [`Platform`] cannot observe.
//! 2. Resolve the root from the ancestor selector, against the tree as it is
//!    now.
//! 3. Dispose the previous handle and advance the generation.
//! 4. Create the new handle with `{root, threshold, root_margin}`.
//! 5. Store it as current.
//!
//! # Step
//!
//! [`step`](VisibilityObserver::step) is the host-driven tick. Queued batches
//! are replayed in arrival order: before a batch's value is pushed, the
//! pending value is released if its window closed by that batch's arrival.
//! Batches are then forwarded to the raw callback and the pending value is
//! released once more against `now`. A host that ticks less often than the
//! window therefore sees the same emissions as one that ticks every
//! millisecond, only later.
//!
//! # Invariants
//!
//! 1. At most one handle is alive; a handle is always disposed before its
//!    replacement is created.
//! 2. Every created handle is disposed exactly once (reconfigure, teardown,
//!    or drop).
//! 3. Batches from a disposed handle never reach the debouncer or callback.
//! 4. Nothing is emitted after teardown.
//! 5. A value is emitted only if no later batch arrived within its window.
//!
//! # Failure Modes
//!
//! - **Capability rejects options**: logged at `warn`; the observer stays in
//!   `Observing` with no live handle until the next reconfiguration.
//! - **Raw callback panics**: callbacks run after all internal state for the
//!   step's batches has been updated, so unwinding leaves the observer
//!   consistent (at worst a later callback of the same step is skipped).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace, warn};
use viewobs_core::{
    IntersectionEntry, ObservationConfig, ObservedElement, ObserverOptions, Platform,
    ResolvedRoot, inspected_entry, resolve_root,
};

use crate::callback::{HandleInfo, ObserverCallback};
use crate::clock::{Clock, HostClock};
use crate::config::RuntimeConfig;
use crate::debounce::Debouncer;
use crate::reactive::Output;
use crate::source::{BatchQueue, BatchSink, IntersectionSource, SourceHandle};

/// Lifecycle state of a [`VisibilityObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    /// Created, never configured (or configured on a platform that cannot
    /// observe).
    Uninitialized,
    /// Configured; a handle is live unless the capability refused one.
    Observing,
    /// Inside a reconfiguration.
    Reconfiguring,
    /// Torn down. Terminal.
    Disposed,
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverStats {
    pub handles_created: u64,
    pub handles_disposed: u64,
    pub create_failures: u64,
    pub batches_processed: u64,
    pub emissions: u64,
}

impl ObserverStats {
    /// Handles created and not yet disposed.
    #[must_use]
    pub const fn live_handles(&self) -> u64 {
        self.handles_created - self.handles_disposed
    }
}

/// Outcome of one [`VisibilityObserver::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepResult {
    /// Batches of the current handle processed in this step.
    pub batches_processed: u32,
    /// Values emitted to the output in this step.
    pub emissions: u32,
    /// Last value emitted in this step.
    pub last_emitted: Option<bool>,
}

struct Live<H, E> {
    handle: H,
    info: Rc<HandleInfo<E>>,
}

/// The visibility controller for one target.
pub struct VisibilityObserver<E, S>
where
    E: ObservedElement,
    S: IntersectionSource<E>,
{
    source: S,
    platform: Platform,
    state: ObserverState,
    live: Option<Live<S::Handle, E>>,
    generation: u64,
    clock: Rc<dyn Clock>,
    queue: Rc<RefCell<BatchQueue>>,
    debouncer: Debouncer<bool>,
    callback: Option<ObserverCallback<E>>,
    output: Output<bool>,
    stable: Option<bool>,
    stats: ObserverStats,
}

impl<E, S> VisibilityObserver<E, S>
where
    E: ObservedElement,
    S: IntersectionSource<E>,
{
    /// Create an unconfigured observer with the default 11ms window.
    #[must_use]
    pub fn new(source: S, platform: Platform) -> Self {
        Self::with_config(source, platform, &RuntimeConfig::default())
    }

    /// Create an unconfigured observer using the window from `config`,
    /// timed by a [`HostClock`] started now.
    #[must_use]
    pub fn with_config(source: S, platform: Platform, config: &RuntimeConfig) -> Self {
        Self::with_clock(source, platform, config, HostClock::new())
    }

    /// Create an unconfigured observer whose batch arrivals are stamped by
    /// `clock`. `step` must be given times on the same timeline.
    #[must_use]
    pub fn with_clock(
        source: S,
        platform: Platform,
        config: &RuntimeConfig,
        clock: impl Clock + 'static,
    ) -> Self {
        let clock: Rc<dyn Clock> = Rc::new(clock);
        Self {
            source,
            platform,
            state: ObserverState::Uninitialized,
            live: None,
            generation: 0,
            queue: Rc::new(RefCell::new(BatchQueue::new(Rc::clone(&clock)))),
            clock,
            debouncer: Debouncer::new(config.debounce),
            callback: None,
            output: Output::new(),
            stable: None,
            stats: ObserverStats::default(),
        }
    }

    /// (Re)establish observation of `target` under `config`.
    ///
    /// No-op after teardown and on platforms that cannot observe.
    pub fn configure(&mut self, target: &E, config: &ObservationConfig) {
        if self.state == ObserverState::Disposed {
            return;
        }
        if !self.platform.supports_observation() {
            debug!(platform = %self.platform, "observation unavailable; skipping configure");
            return;
        }

        let reconfigured = self.state != ObserverState::Uninitialized;
        self.state = ObserverState::Reconfiguring;

        let root = resolve_root(target, config.effective_selector());
        self.dispose_live();

        self.generation += 1;
        self.queue.borrow_mut().advance(self.generation);
        let options = ObserverOptions::from_config(root, config);
        let sink = BatchSink::new(&self.queue, self.generation);

        match self.source.create(target, &options, sink) {
            Ok(handle) => {
                self.stats.handles_created += 1;
                debug!(
                    generation = self.generation,
                    root = ?options.root,
                    threshold = %options.threshold,
                    root_margin = %options.root_margin,
                    reconfigured,
                    "observation started"
                );
                self.live = Some(Live {
                    handle,
                    info: Rc::new(HandleInfo {
                        generation: self.generation,
                        options,
                    }),
                });
            }
            Err(err) => {
                self.stats.create_failures += 1;
                warn!(
                    generation = self.generation,
                    error = %err,
                    "intersection capability refused to observe"
                );
            }
        }
        self.state = ObserverState::Observing;
    }

    /// Replace the raw batch callback. Takes effect from the next batch.
    pub fn set_callback(&mut self, callback: Option<ObserverCallback<E>>) {
        if self.state != ObserverState::Disposed {
            self.callback = callback;
        }
    }

    /// Host tick; see the module docs for the order of work.
    ///
    /// Arrivals stamped later than `now` are treated as arriving at `now`.
    pub fn step(&mut self, now: Duration) -> StepResult {
        let mut result = StepResult::default();
        if self.state == ObserverState::Disposed {
            return result;
        }

        let queued = self.queue.borrow_mut().drain();
        let mut forwards = Vec::new();
        for batch in queued {
            if batch.generation != self.generation {
                continue;
            }
            let info = match &self.live {
                Some(live) => Rc::clone(&live.info),
                None => continue,
            };
            let arrived_at = batch.arrived_at.min(now);
            self.settle(arrived_at, &mut result);
            if let Some(entry) = inspected_entry(&batch.entries) {
                trace!(
                    generation = batch.generation,
                    is_intersecting = entry.is_intersecting,
                    arrived_at = ?arrived_at,
                    records = batch.entries.len(),
                    "batch queued for debounce"
                );
                self.debouncer.push(entry.is_intersecting, arrived_at);
            }
            self.stats.batches_processed += 1;
            result.batches_processed += 1;
            if let Some(cb) = &self.callback {
                forwards.push((cb.clone(), info, batch.entries));
            }
        }

        for (cb, info, entries) in forwards {
            cb.call(&entries, &info);
        }

        self.settle(now, &mut result);
        result
    }

    /// [`step`](Self::step) at the clock's current time.
    pub fn tick(&mut self) -> StepResult {
        let now = self.clock.now();
        self.step(now)
    }

    /// Current time on the observer's clock.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Release everything: handle, pending value, callback, output sink.
    ///
    /// Safe from any state and idempotent.
    pub fn teardown(&mut self) {
        if self.state == ObserverState::Disposed {
            return;
        }
        self.dispose_live();
        self.queue.borrow_mut().close();
        let discarded = self.debouncer.cancel();
        self.callback = None;
        self.output.detach();
        self.state = ObserverState::Disposed;
        debug!(
            generation = self.generation,
            discarded_pending = discarded,
            "observer torn down"
        );
    }

    /// The `visible_change` stream.
    #[must_use]
    pub fn output(&self) -> &Output<bool> {
        &self.output
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ObserverState {
        self.state
    }

    /// Whether a handle is live.
    #[must_use]
    pub fn has_live_handle(&self) -> bool {
        self.live.is_some()
    }

    /// Options of the live handle.
    #[must_use]
    pub fn current_options(&self) -> Option<&ObserverOptions<E>> {
        self.live.as_ref().map(|live| &live.info.options)
    }

    /// Root of the live handle.
    #[must_use]
    pub fn current_root(&self) -> Option<&ResolvedRoot<E>> {
        self.current_options().map(|options| &options.root)
    }

    /// Generation of the most recent configure attempt (0 before the first).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last value emitted to the output.
    #[must_use]
    pub fn stable_visibility(&self) -> Option<bool> {
        self.stable
    }

    /// Value waiting for its window to elapse.
    #[must_use]
    pub fn pending_visibility(&self) -> Option<bool> {
        self.debouncer.pending().copied()
    }

    /// When the pending value becomes releasable.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.debouncer.deadline()
    }

    /// Whether a raw callback is set.
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> ObserverStats {
        self.stats
    }

    /// Batches dropped because their handle was already disposed.
    #[must_use]
    pub fn stale_batches(&self) -> u64 {
        self.queue.borrow().stale_dropped()
    }

    /// The capability.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The injected platform.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn settle(&mut self, now: Duration, result: &mut StepResult) {
        if let Some(visible) = self.debouncer.poll(now) {
            self.stable = Some(visible);
            self.stats.emissions += 1;
            result.emissions += 1;
            result.last_emitted = Some(visible);
            debug!(visible, generation = self.generation, "visibility settled");
            self.output.emit(visible);
        }
    }

    fn dispose_live(&mut self) {
        if let Some(mut live) = self.live.take() {
            live.handle.dispose();
            self.stats.handles_disposed += 1;
            trace!(generation = live.info.generation, "handle disposed");
        }
    }
}

impl<E, S> Drop for VisibilityObserver<E, S>
where
    E: ObservedElement,
    S: IntersectionSource<E>,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<E, S> fmt::Debug for VisibilityObserver<E, S>
where
    E: ObservedElement,
    S: IntersectionSource<E>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityObserver")
            .field("state", &self.state)
            .field("platform", &self.platform)
            .field("generation", &self.generation)
            .field("live", &self.live.is_some())
            .field("pending", &self.debouncer.pending())
            .field("stable", &self.stable)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// The record of `batch` that drives visibility, for hosts that inspect
/// batches themselves.
#[must_use]
pub fn batch_visibility(batch: &[IntersectionEntry]) -> Option<bool> {
    inspected_entry(batch).map(|entry| entry.is_intersecting)
}
