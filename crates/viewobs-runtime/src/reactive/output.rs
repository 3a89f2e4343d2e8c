#![forbid(unsafe_code)]

//! Output event stream.
//!
//! [`Output<T>`] is the observer's `visible_change` port. It shares the
//! subscriber model of [`Observable`](super::Observable) (weak callbacks,
//! RAII [`Subscription`] guards, registration order) but has no current
//! value and no equality filter: each `emit` is one event.
//!
//! Once [`detach`](Output::detach) runs, the stream is closed for good. Every
//! subscriber is released and later emits are dropped. Teardown uses this to
//! guarantee that nothing reaches the consumer after destruction.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::observable::Subscription;

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct OutputInner<T> {
    subscribers: Vec<CallbackWeak<T>>,
    emitted: u64,
    detached: bool,
}

/// A multicast event stream with no memory of past events.
pub struct Output<T> {
    inner: Rc<RefCell<OutputInner<T>>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Output")
            .field("emitted", &inner.emitted)
            .field("detached", &inner.detached)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: 'static> Default for Output<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Output<T> {
    /// Create an open stream with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(OutputInner {
                subscribers: Vec::new(),
                emitted: 0,
                detached: false,
            })),
        }
    }

    /// Register an event callback. Dropping the guard unsubscribes.
    ///
    /// Subscribing to a detached stream returns a guard whose callback is
    /// never called.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        let mut inner = self.inner.borrow_mut();
        if !inner.detached {
            inner.subscribers.push(Rc::downgrade(&strong));
        }
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `value` to every live subscriber, in registration order.
    ///
    /// Returns `false` when the stream is detached and nothing was delivered.
    pub fn emit(&self, value: T) -> bool {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            if inner.detached {
                return false;
            }
            inner.emitted += 1;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(Weak::upgrade)
                .collect()
        };
        for cb in &callbacks {
            cb(&value);
        }
        true
    }

    /// Close the stream and release every subscriber. Idempotent.
    pub fn detach(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.detached = true;
        inner.subscribers.clear();
    }

    /// Whether [`detach`](Self::detach) has run.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.inner.borrow().detached
    }

    /// Number of accepted emits.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.inner.borrow().emitted
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}
