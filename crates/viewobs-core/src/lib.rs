#![forbid(unsafe_code)]

//! Core: observation options, intersection records, and element lookup.
//!
//! # Role in viewobs
//! `viewobs-core` is the data layer. It owns the value types that flow between
//! the host, the visibility controller, and the intersection capability:
//!
//! - **Options**: [`Threshold`], [`RootMargin`], [`ObservationConfig`], and the
//!   per-handle [`ObserverOptions`] with its [`ResolvedRoot`].
//! - **Records**: [`IntersectionEntry`], the unit inside a delivered batch.
//! - **Elements**: the [`ObservedElement`] trait (anything that can answer
//!   `closest(selector)`) and an in-memory [`dom`] tree implementing it.
//! - **Platform**: the injected [`Platform`] flag that gates observation.
//!
//! # How it fits in the system
//! `viewobs-runtime` builds the controller state machine on top of these
//! types. Capability backends (`viewobs-web`, the test harness) only need this
//! crate plus the runtime's `IntersectionSource` trait.

pub mod dom;
pub mod element;
pub mod entry;
pub mod logging;
pub mod options;
pub mod platform;

pub use element::{ObservedElement, resolve_root};
pub use entry::{IntersectionEntry, inspected_entry};
pub use options::{
    DEFAULT_ROOT_MARGIN, DEFAULT_THRESHOLD, ObservationConfig, ObserverOptions, ResolvedRoot,
    RootMargin, Threshold,
};
pub use platform::Platform;
