#![forbid(unsafe_code)]

//! Attachable visibility observer with reactive inputs.
//!
//! [`ViewObserver`] is what a host instantiates per element. It exposes its
//! inputs as [`Observable`]s, its output as an [`Output<bool>`], and is driven
//! by the host through [`step`](ViewObserver::step) and
//! [`destroy`](ViewObserver::destroy).
//!
//! ```text
//! host writes inputs ──▶ Observable::set ──▶ dirty flag
//!                                              │
//! host frame ──▶ tick() / step(now) ──▶ reconfigure if dirty ──▶ controller.step(now)
//!                                                           │
//!                                      visible_change ◀─────┘
//! ```
//!
//! Changes to `target`, `threshold`, `root_margin`, or `ancestor_selector`
//! schedule a reconfiguration for the next step; several changes between two
//! steps collapse into one. `observer_callback` changes never reconfigure:
//! the current callback is handed to the controller at every step and used
//! from the next batch on.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use viewobs_core::Platform;
//! use viewobs_core::dom::{DomTree, NodeRef};
//! use viewobs_runtime::source::{BatchSink, IntersectionSource, SourceError, SourceHandle};
//! use viewobs_runtime::{ManualClock, RuntimeConfig, ViewObserver};
//! use viewobs_core::ObserverOptions;
//!
//! struct Handle;
//! impl SourceHandle for Handle {
//!     fn dispose(&mut self) {}
//! }
//!
//! #[derive(Default)]
//! struct Source(Rc<RefCell<Option<BatchSink>>>);
//! impl IntersectionSource<NodeRef> for Source {
//!     type Handle = Handle;
//!     fn create(
//!         &mut self,
//!         _target: &NodeRef,
//!         _options: &ObserverOptions<NodeRef>,
//!         sink: BatchSink,
//!     ) -> Result<Handle, SourceError> {
//!         *self.0.borrow_mut() = Some(sink);
//!         Ok(Handle)
//!     }
//! }
//!
//! let tree = DomTree::new();
//! let sink = Rc::new(RefCell::new(None));
//! let clock = ManualClock::new();
//! let mut observer = ViewObserver::with_clock(
//!     tree.create_element("div"),
//!     Source(Rc::clone(&sink)),
//!     Platform::Browser,
//!     &RuntimeConfig::default(),
//!     clock.clone(),
//! );
//!
//! observer.tick();
//! let sink = sink.borrow().clone().unwrap();
//! sink.deliver(vec![viewobs_core::IntersectionEntry::visible()]);
//! clock.advance(Duration::from_millis(16));
//! observer.tick();
//! assert_eq!(observer.is_visible(), Some(true));
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use viewobs_core::{ObservationConfig, ObservedElement, Platform, RootMargin, Threshold};

use crate::callback::ObserverCallback;
use crate::clock::{Clock, HostClock};
use crate::config::RuntimeConfig;
use crate::controller::{ObserverState, StepResult, VisibilityObserver};
use crate::reactive::{Binding, BindingScope, Observable, Output};
use crate::source::IntersectionSource;

/// A visibility observer bound to one element through reactive inputs.
pub struct ViewObserver<E, S>
where
    E: ObservedElement,
    S: IntersectionSource<E>,
{
    target: Observable<E>,
    threshold: Observable<Threshold>,
    root_margin: Observable<RootMargin>,
    ancestor_selector: Observable<Option<String>>,
    observer_callback: Observable<Option<ObserverCallback<E>>>,
    config: Binding<ObservationConfig>,
    dirty: Rc<Cell<bool>>,
    scope: BindingScope,
    controller: VisibilityObserver<E, S>,
}

impl<E, S> ViewObserver<E, S>
where
    E: ObservedElement,
    S: IntersectionSource<E>,
{
    /// Attach to `target` with default inputs and an 11ms window.
    ///
    /// Observation starts at the first [`step`](Self::step).
    #[must_use]
    pub fn new(target: E, source: S, platform: Platform) -> Self {
        Self::with_config(target, source, platform, &RuntimeConfig::default())
    }

    /// Attach to `target` with initial inputs and window from `config`,
    /// timed by a [`HostClock`] started now.
    #[must_use]
    pub fn with_config(target: E, source: S, platform: Platform, config: &RuntimeConfig) -> Self {
        Self::with_clock(target, source, platform, config, HostClock::new())
    }

    /// Attach with an explicit clock. Times passed to [`step`](Self::step)
    /// must come from the same timeline.
    #[must_use]
    pub fn with_clock(
        target: E,
        source: S,
        platform: Platform,
        config: &RuntimeConfig,
        clock: impl Clock + 'static,
    ) -> Self {
        let target = Observable::new(target);
        let threshold = Observable::new(config.observation.threshold.clone());
        let root_margin = Observable::new(config.observation.root_margin.clone());
        let ancestor_selector = Observable::new(config.observation.ancestor_selector.clone());
        let observer_callback = Observable::new(None);

        let config_binding = {
            let (t, m, a) = (threshold.clone(), root_margin.clone(), ancestor_selector.clone());
            Binding::new(move || ObservationConfig {
                threshold: t.get(),
                root_margin: m.get(),
                ancestor_selector: a.get(),
            })
        };

        // First activation counts as a change.
        let dirty = Rc::new(Cell::new(true));
        let mut scope = BindingScope::new();
        scope
            .subscribe(&target, mark_dirty(&dirty))
            .subscribe(&threshold, mark_dirty(&dirty))
            .subscribe(&root_margin, mark_dirty(&dirty))
            .subscribe(&ancestor_selector, mark_dirty(&dirty));

        Self {
            target,
            threshold,
            root_margin,
            ancestor_selector,
            observer_callback,
            config: config_binding,
            dirty,
            scope,
            controller: VisibilityObserver::with_clock(source, platform, config, clock),
        }
    }

    /// The observed element.
    #[must_use]
    pub fn target(&self) -> &Observable<E> {
        &self.target
    }

    /// Threshold input.
    #[must_use]
    pub fn threshold(&self) -> &Observable<Threshold> {
        &self.threshold
    }

    /// Root margin input.
    #[must_use]
    pub fn root_margin(&self) -> &Observable<RootMargin> {
        &self.root_margin
    }

    /// Ancestor selector input.
    #[must_use]
    pub fn ancestor_selector(&self) -> &Observable<Option<String>> {
        &self.ancestor_selector
    }

    /// Raw callback input.
    #[must_use]
    pub fn observer_callback(&self) -> &Observable<Option<ObserverCallback<E>>> {
        &self.observer_callback
    }

    /// Replace threshold, margin, and selector in one go. Unchanged fields do
    /// not schedule a reconfiguration.
    pub fn set_config(&self, config: &ObservationConfig) {
        self.threshold.set(config.threshold.clone());
        self.root_margin.set(config.root_margin.clone());
        self.ancestor_selector.set(config.ancestor_selector.clone());
    }

    /// Snapshot of the current configuration inputs.
    #[must_use]
    pub fn config(&self) -> ObservationConfig {
        self.config.get()
    }

    /// The settled visibility stream.
    #[must_use]
    pub fn visible_change(&self) -> &Output<bool> {
        self.controller.output()
    }

    /// Whether a reconfiguration is scheduled for the next step.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Host tick: apply pending input changes, then run the controller.
    pub fn step(&mut self, now: Duration) -> StepResult {
        if self.controller.state() == ObserverState::Disposed {
            return StepResult::default();
        }
        if self.dirty.replace(false) {
            let target = self.target.get();
            let config = self.config.get();
            self.controller.configure(&target, &config);
        }
        self.controller.set_callback(self.observer_callback.get());
        self.controller.step(now)
    }

    /// [`step`](Self::step) at the clock's current time.
    pub fn tick(&mut self) -> StepResult {
        let now = self.controller.now();
        self.step(now)
    }

    /// Teardown hook. Releases input subscriptions, the handle, the pending
    /// value, the callback, and the output. Idempotent.
    pub fn destroy(&mut self) {
        self.scope.clear();
        self.dirty.set(false);
        self.observer_callback.set(None);
        self.controller.teardown();
    }

    /// Last settled visibility, `None` before the first emission.
    #[must_use]
    pub fn is_visible(&self) -> Option<bool> {
        self.controller.stable_visibility()
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> ObserverState {
        self.controller.state()
    }

    /// The underlying controller.
    #[must_use]
    pub fn controller(&self) -> &VisibilityObserver<E, S> {
        &self.controller
    }
}

fn mark_dirty<T>(dirty: &Rc<Cell<bool>>) -> impl Fn(&T) + 'static {
    let dirty = Rc::clone(dirty);
    move |_| dirty.set(true)
}

impl<E, S> fmt::Debug for ViewObserver<E, S>
where
    E: ObservedElement,
    S: IntersectionSource<E>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewObserver")
            .field("config", &self.config.get())
            .field("dirty", &self.dirty.get())
            .field("bindings", &self.scope.binding_count())
            .field("controller", &self.controller)
            .finish()
    }
}
