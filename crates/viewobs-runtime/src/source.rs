#![forbid(unsafe_code)]

//! Intersection capability contract.
//!
//! An [`IntersectionSource`] is the black box that knows how to watch an
//! element: given a target, [`ObserverOptions`], and a [`BatchSink`], it
//! returns a [`SourceHandle`] and later pushes batches of
//! [`IntersectionEntry`] records into the sink until the handle is disposed.
//!
//! # Delivery model
//!
//! Delivery is always asynchronous from the controller's point of view. The
//! sink only enqueues, stamping each batch with its arrival time from the
//! controller's [`Clock`]; the controller drains the queue on its next `step`
//! and debounces on those arrival times, not on the time of the step.
//! A capability that delivers from inside `create` is therefore harmless:
//! nothing is processed before `create` has returned and the handle has been
//! stored.
//!
//! # Generations
//!
//! Every handle is created with a sink stamped with a generation token. When
//! the controller disposes a handle it advances the queue's generation, so
//! batches still in flight from the old handle are dropped on delivery (or at
//! drain time if they were already queued).
//!
//! # Contract for implementors
//!
//! 1. `create` must not block.
//! 2. `dispose` is idempotent, never panics, and stops delivery.
//! 3. Batches are pushed in the order the capability produced them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use std::time::Duration;

use viewobs_core::{IntersectionEntry, ObservedElement, ObserverOptions};

use crate::clock::Clock;

/// A batch of records as delivered by one capability callback.
pub type Batch = Vec<IntersectionEntry>;

/// Why a capability refused to create a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The capability is missing in this environment.
    Unavailable,
    /// The capability rejected the options (e.g. a malformed root margin).
    Rejected { reason: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "intersection capability is unavailable"),
            Self::Rejected { reason } => {
                write!(f, "intersection capability rejected options: {reason}")
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// A live observation created by an [`IntersectionSource`].
pub trait SourceHandle {
    /// Stop delivery and release resources. Must be idempotent.
    fn dispose(&mut self);
}

/// The intersection capability.
pub trait IntersectionSource<E: ObservedElement> {
    /// Handle type returned by [`create`](Self::create).
    type Handle: SourceHandle;

    /// Begin observing `target` with `options`, pushing batches into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the capability is missing or rejects the
    /// options. The controller keeps running without a live handle.
    fn create(
        &mut self,
        target: &E,
        options: &ObserverOptions<E>,
        sink: BatchSink,
    ) -> Result<Self::Handle, SourceError>;
}

/// A batch waiting for the controller, stamped with its handle's generation
/// and the time it arrived.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueuedBatch {
    pub(crate) generation: u64,
    pub(crate) arrived_at: Duration,
    pub(crate) entries: Batch,
}

/// Shared queue between the sinks and the controller.
pub(crate) struct BatchQueue {
    clock: Rc<dyn Clock>,
    pending: VecDeque<QueuedBatch>,
    generation: u64,
    closed: bool,
    stale_dropped: u64,
}

impl BatchQueue {
    pub(crate) fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            pending: VecDeque::new(),
            generation: 0,
            closed: false,
            stale_dropped: 0,
        }
    }

    /// Advance to `generation`, discarding queued batches of older ones.
    pub(crate) fn advance(&mut self, generation: u64) {
        self.generation = generation;
        let before = self.pending.len();
        self.pending.retain(|b| b.generation == generation);
        self.stale_dropped += (before - self.pending.len()) as u64;
    }

    /// Refuse all further deliveries and drop anything queued.
    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }

    /// Take every queued batch of the current generation, in arrival order.
    pub(crate) fn drain(&mut self) -> VecDeque<QueuedBatch> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    fn push(&mut self, generation: u64, entries: Batch) -> Delivery {
        if self.closed {
            return Delivery::Closed;
        }
        if generation != self.generation {
            self.stale_dropped += 1;
            return Delivery::Stale;
        }
        let arrived_at = self.clock.now();
        self.pending.push_back(QueuedBatch {
            generation,
            arrived_at,
            entries,
        });
        Delivery::Queued
    }
}

impl fmt::Debug for BatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchQueue")
            .field("pending", &self.pending.len())
            .field("generation", &self.generation)
            .field("closed", &self.closed)
            .field("stale_dropped", &self.stale_dropped)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`BatchSink::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the controller's next step.
    Queued,
    /// Dropped: the handle this sink belongs to was disposed.
    Stale,
    /// Dropped: the controller was torn down or no longer exists.
    Closed,
}

/// Where a capability pushes batches for one handle.
///
/// Holds the controller's queue weakly; a sink outliving its controller just
/// reports [`Delivery::Closed`].
#[derive(Clone)]
pub struct BatchSink {
    queue: Weak<RefCell<BatchQueue>>,
    generation: u64,
}

impl BatchSink {
    pub(crate) fn new(queue: &Rc<RefCell<BatchQueue>>, generation: u64) -> Self {
        Self {
            queue: Rc::downgrade(queue),
            generation,
        }
    }

    /// Push one batch, stamped with the current time of the controller's
    /// clock.
    pub fn deliver(&self, entries: Batch) -> Delivery {
        match self.queue.upgrade() {
            Some(queue) => queue.borrow_mut().push(self.generation, entries),
            None => Delivery::Closed,
        }
    }

    /// Generation of the handle this sink was created for.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a delivery now would be dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.upgrade().is_none_or(|queue| {
            let queue = queue.borrow();
            queue.closed || queue.generation != self.generation
        })
    }
}

impl fmt::Debug for BatchSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSink")
            .field("generation", &self.generation)
            .field("closed", &self.is_closed())
            .finish()
    }
}
