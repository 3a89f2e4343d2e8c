#![forbid(unsafe_code)]

//! Browser backend for viewobs.
//!
//! On `wasm32` this crate provides [`DomIntersectionSource`], an
//! `IntersectionSource` backed by the browser's `IntersectionObserver`, and
//! [`WebElement`], a `web_sys::Element` wrapper that resolves ancestor
//! selectors with the native `Element.closest`.
//!
//! [`detect_platform`] is available everywhere; on native targets it always
//! reports [`Platform::Server`], so an observer built there stays inert.

mod platform;
mod timestamp;

#[cfg(target_arch = "wasm32")]
mod element;
#[cfg(target_arch = "wasm32")]
mod source;

pub use platform::detect_platform;
pub use timestamp::entry_time;
pub use viewobs_core::Platform;

#[cfg(target_arch = "wasm32")]
pub use element::WebElement;
#[cfg(target_arch = "wasm32")]
pub use source::{DomIntersectionSource, DomObservation};
