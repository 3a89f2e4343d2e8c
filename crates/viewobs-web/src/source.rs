#![forbid(unsafe_code)]

//! `IntersectionObserver` capability.
//!
//! One [`DomObservation`] wraps one native observer watching one target.
//! Dispose (or drop) disconnects it; the callback closure lives exactly as
//! long as the observer.

use js_sys::{Array, Reflect};
use viewobs_core::{IntersectionEntry, ObserverOptions, ResolvedRoot, Threshold};
use viewobs_runtime::source::{BatchSink, IntersectionSource, SourceError, SourceHandle};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::Closure;
use web_sys::{IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use crate::element::WebElement;
use crate::timestamp::entry_time;

/// Creates native `IntersectionObserver`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomIntersectionSource;

impl DomIntersectionSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// A live native observer.
pub struct DomObservation {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array)>,
    connected: bool,
}

impl std::fmt::Debug for DomObservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomObservation")
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl SourceHandle for DomObservation {
    fn dispose(&mut self) {
        if self.connected {
            self.connected = false;
            self.observer.disconnect();
            #[cfg(feature = "tracing")]
            tracing::trace!("intersection observer disconnected");
        }
    }
}

impl Drop for DomObservation {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl IntersectionSource<WebElement> for DomIntersectionSource {
    type Handle = DomObservation;

    fn create(
        &mut self,
        target: &WebElement,
        options: &ObserverOptions<WebElement>,
        sink: BatchSink,
    ) -> Result<DomObservation, SourceError> {
        let init = observer_init(options)?;

        let callback = Closure::<dyn FnMut(Array)>::new(move |records: Array| {
            let batch: Vec<IntersectionEntry> = records
                .iter()
                .filter_map(|record| record.dyn_into::<IntersectionObserverEntry>().ok())
                .map(|record| {
                    IntersectionEntry::new(record.is_intersecting(), record.intersection_ratio())
                        .at(entry_time(record.time()))
                })
                .collect();
            let _delivery = sink.deliver(batch);
            #[cfg(feature = "tracing")]
            tracing::trace!(delivery = ?_delivery, "intersection batch delivered");
        });

        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
                .map_err(rejected)?;
        observer.observe(target.as_element());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            threshold = %options.threshold,
            root_margin = %options.root_margin,
            viewport = options.root.is_viewport(),
            "intersection observer connected"
        );

        Ok(DomObservation {
            observer,
            _callback: callback,
            connected: true,
        })
    }
}

fn observer_init(options: &ObserverOptions<WebElement>) -> Result<IntersectionObserverInit, SourceError> {
    let init = IntersectionObserverInit::new();
    init.set_root_margin(options.root_margin.as_str());
    init.set_threshold(&threshold_value(&options.threshold));
    // `root` accepts an Element or a Document; null means the viewport.
    let root = match &options.root {
        ResolvedRoot::Viewport => JsValue::NULL,
        ResolvedRoot::Ancestor(element) => JsValue::from(element.as_element().clone()),
    };
    Reflect::set(&init, &JsValue::from_str("root"), &root).map_err(rejected)?;
    Ok(init)
}

fn threshold_value(threshold: &Threshold) -> JsValue {
    match threshold {
        Threshold::Single(ratio) => JsValue::from_f64(*ratio),
        Threshold::List(ratios) => ratios
            .iter()
            .map(|ratio| JsValue::from_f64(*ratio))
            .collect::<Array>()
            .into(),
    }
}

fn rejected(err: JsValue) -> SourceError {
    SourceError::Rejected {
        reason: err
            .as_string()
            .or_else(|| {
                err.dyn_ref::<js_sys::Error>()
                    .map(|e| String::from(e.message()))
            })
            .unwrap_or_else(|| format!("{err:?}")),
    }
}
