#![forbid(unsafe_code)]

//! Capture observer output for assertions.

use std::cell::RefCell;
use std::rc::Rc;

use viewobs_core::dom::NodeRef;
use viewobs_core::{IntersectionEntry, ResolvedRoot};
use viewobs_runtime::{ObserverCallback, Output, Subscription};

/// Records every value emitted on a `visible_change` stream.
#[derive(Debug)]
pub struct EmissionRecorder {
    values: Rc<RefCell<Vec<bool>>>,
    _subscription: Subscription,
}

impl EmissionRecorder {
    /// Subscribe to `output`. Recording stops when the recorder is dropped.
    #[must_use]
    pub fn attach(output: &Output<bool>) -> Self {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&values);
        let subscription = output.subscribe(move |v| sink.borrow_mut().push(*v));
        Self {
            values,
            _subscription: subscription,
        }
    }

    /// Everything emitted so far, in order.
    #[must_use]
    pub fn values(&self) -> Vec<bool> {
        self.values.borrow().clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.values.borrow().len()
    }

    #[must_use]
    pub fn last(&self) -> Option<bool> {
        self.values.borrow().last().copied()
    }

    /// Take and clear the recorded values.
    pub fn drain(&self) -> Vec<bool> {
        std::mem::take(&mut *self.values.borrow_mut())
    }
}

/// One raw batch as the callback saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub generation: u64,
    pub root: ResolvedRoot<NodeRef>,
    pub entries: Vec<IntersectionEntry>,
}

/// Builds raw callbacks that record what they receive.
#[derive(Debug, Clone, Default)]
pub struct BatchRecorder {
    batches: Rc<RefCell<Vec<RecordedBatch>>>,
}

impl BatchRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback appending to this recorder. Each call returns a distinct
    /// callback identity.
    #[must_use]
    pub fn callback(&self) -> ObserverCallback<NodeRef> {
        let batches = Rc::clone(&self.batches);
        ObserverCallback::new(move |entries, info| {
            batches.borrow_mut().push(RecordedBatch {
                generation: info.generation,
                root: info.options.root.clone(),
                entries: entries.to_vec(),
            });
        })
    }

    #[must_use]
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.borrow().clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.batches.borrow().len()
    }
}
