#![forbid(unsafe_code)]

//! Scriptable intersection capability.
//!
//! Clones share state, so a test keeps one clone for scripting while the
//! observer owns another.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;
use viewobs_core::dom::NodeRef;
use viewobs_core::{IntersectionEntry, ObserverOptions};
use viewobs_runtime::source::{
    Batch, BatchSink, Delivery, IntersectionSource, SourceError, SourceHandle,
};

/// One `create` call as the capability saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRecord {
    pub generation: u64,
    pub target: NodeRef,
    pub options: ObserverOptions<NodeRef>,
}

#[derive(Debug, Default)]
struct MockState {
    created: Vec<CreateRecord>,
    disposed: Vec<u64>,
    sinks: Vec<BatchSink>,
    alive: usize,
    max_alive: usize,
    reject: Option<String>,
    on_create: Option<Batch>,
}

/// Capability double for tests.
#[derive(Debug, Clone, Default)]
pub struct MockIntersectionSource {
    state: Rc<RefCell<MockState>>,
}

impl MockIntersectionSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every following `create` with `reason`, until [`accept`](Self::accept).
    pub fn reject(&self, reason: impl Into<String>) {
        self.state.borrow_mut().reject = Some(reason.into());
    }

    /// Stop rejecting.
    pub fn accept(&self) {
        self.state.borrow_mut().reject = None;
    }

    /// Deliver `batch` from inside the next successful `create`, before the
    /// handle is returned.
    pub fn deliver_on_create(&self, batch: Batch) {
        self.state.borrow_mut().on_create = Some(batch);
    }

    /// Deliver a batch through the most recently created handle. It arrives
    /// at the observer clock's current time.
    ///
    /// Returns `None` when no handle was ever created.
    pub fn fire(&self, batch: Batch) -> Option<Delivery> {
        let sink = self.state.borrow().sinks.last().cloned();
        sink.map(|sink| sink.deliver(batch))
    }

    /// Deliver a one-record batch.
    pub fn fire_intersecting(&self, is_intersecting: bool) -> Option<Delivery> {
        let entry = if is_intersecting {
            IntersectionEntry::visible()
        } else {
            IntersectionEntry::hidden()
        };
        self.fire(vec![entry])
    }

    /// Deliver a batch through the handle of `generation`, live or not.
    pub fn fire_on(&self, generation: u64, batch: Batch) -> Option<Delivery> {
        let sink = self
            .state
            .borrow()
            .sinks
            .iter()
            .find(|sink| sink.generation() == generation)
            .cloned();
        sink.map(|sink| sink.deliver(batch))
    }

    /// Every `create` so far, in order.
    #[must_use]
    pub fn created(&self) -> Vec<CreateRecord> {
        self.state.borrow().created.clone()
    }

    /// The most recent `create`.
    #[must_use]
    pub fn last_created(&self) -> Option<CreateRecord> {
        self.state.borrow().created.last().cloned()
    }

    /// Number of successful creates.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.state.borrow().created.len()
    }

    /// Generations disposed so far, in order.
    #[must_use]
    pub fn disposed(&self) -> Vec<u64> {
        self.state.borrow().disposed.clone()
    }

    /// Handles currently alive.
    #[must_use]
    pub fn alive(&self) -> usize {
        self.state.borrow().alive
    }

    /// Highest number of handles ever alive at once.
    #[must_use]
    pub fn max_alive(&self) -> usize {
        self.state.borrow().max_alive
    }
}

impl IntersectionSource<NodeRef> for MockIntersectionSource {
    type Handle = MockHandle;

    fn create(
        &mut self,
        target: &NodeRef,
        options: &ObserverOptions<NodeRef>,
        sink: BatchSink,
    ) -> Result<MockHandle, SourceError> {
        let on_create = {
            let mut state = self.state.borrow_mut();
            if let Some(reason) = state.reject.clone() {
                return Err(SourceError::Rejected { reason });
            }
            state.alive += 1;
            state.max_alive = state.max_alive.max(state.alive);
            state.created.push(CreateRecord {
                generation: sink.generation(),
                target: target.clone(),
                options: options.clone(),
            });
            state.sinks.push(sink.clone());
            state.on_create.take()
        };
        trace!(generation = sink.generation(), "mock handle created");
        if let Some(batch) = on_create {
            sink.deliver(batch);
        }
        Ok(MockHandle {
            generation: sink.generation(),
            state: Rc::clone(&self.state),
            disposed: false,
        })
    }
}

/// Handle returned by [`MockIntersectionSource`].
#[derive(Debug)]
pub struct MockHandle {
    generation: u64,
    state: Rc<RefCell<MockState>>,
    disposed: bool,
}

impl MockHandle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl SourceHandle for MockHandle {
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let mut state = self.state.borrow_mut();
        state.alive -= 1;
        state.disposed.push(self.generation);
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        // Undisposed drops stay counted in `alive`.
        if !self.disposed {
            trace!(generation = self.generation, "mock handle dropped undisposed");
        }
    }
}
