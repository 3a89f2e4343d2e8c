#![forbid(unsafe_code)]

//! Debounced visibility observation.
//!
//! # Role in viewobs
//! `viewobs-runtime` owns everything with state: the [`VisibilityObserver`]
//! state machine, the trailing [`Debouncer`], the capability contract in
//! [`source`], and the [`reactive`] primitives that bind host inputs to an
//! observer through [`ViewObserver`].
//!
//! # How it fits in the system
//! `viewobs-core` supplies the pure data (options, entries, root resolution).
//! `viewobs-web` implements [`IntersectionSource`] on top of the browser's
//! `IntersectionObserver`; `viewobs-harness` implements it as a scriptable
//! mock. Time comes from the host: a [`Clock`] stamps batch arrivals and
//! `step` receives the tick time, so the same observer runs unchanged under
//! test, natively, and on `wasm32`.

pub mod callback;
pub mod clock;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod reactive;
pub mod source;
pub mod view_observer;

pub use callback::{HandleInfo, ObserverCallback};
pub use clock::{Clock, HostClock, ManualClock};
pub use config::{ConfigError, RuntimeConfig};
pub use controller::{
    ObserverState, ObserverStats, StepResult, VisibilityObserver, batch_visibility,
};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use reactive::{Binding, BindingScope, Observable, Output, Subscription};
pub use source::{Batch, BatchSink, Delivery, IntersectionSource, SourceError, SourceHandle};
pub use view_observer::ViewObserver;
