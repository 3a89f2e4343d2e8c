#![forbid(unsafe_code)]

//! viewobs public facade.
//!
//! Tells a host whether an element is visible, debounced so that scroll
//! jitter collapses into one settled `bool`.
//!
//! ```
//! use viewobs::prelude::*;
//!
//! let config = RuntimeConfig::default()
//!     .with_threshold([0.0, 0.5, 1.0])
//!     .with_ancestor_selector(".feed");
//! assert_eq!(config.debounce, DEFAULT_DEBOUNCE);
//! ```
//!
//! In the browser, pair a [`ViewObserver`](viewobs_runtime::ViewObserver)
//! with `viewobs_web::DomIntersectionSource` and
//! [`detect_platform`](viewobs_web::detect_platform), then call `tick` from
//! the host's frame loop.

pub use viewobs_core as core;
pub use viewobs_runtime as runtime;
#[cfg(feature = "web")]
pub use viewobs_web as web;

pub use viewobs_core::{
    IntersectionEntry, ObservationConfig, ObservedElement, ObserverOptions, Platform,
    ResolvedRoot, RootMargin, Threshold,
};
pub use viewobs_runtime::{
    BatchSink, Clock, Delivery, HostClock, IntersectionSource, ManualClock, ObserverCallback,
    ObserverState, RuntimeConfig, SourceError, SourceHandle, StepResult, ViewObserver,
    VisibilityObserver,
};

/// Everything a host usually needs.
pub mod prelude {
    pub use viewobs_core::{
        IntersectionEntry, ObservationConfig, ObservedElement, Platform, ResolvedRoot,
        RootMargin, Threshold,
    };
    pub use viewobs_runtime::{
        Clock, DEFAULT_DEBOUNCE, HandleInfo, HostClock, IntersectionSource, ObserverCallback,
        ObserverState, Output, RuntimeConfig, StepResult, Subscription, ViewObserver,
        VisibilityObserver,
    };

    #[cfg(feature = "web")]
    pub use viewobs_web::detect_platform;
    #[cfg(all(feature = "web", target_arch = "wasm32"))]
    pub use viewobs_web::{DomIntersectionSource, WebElement};
}
