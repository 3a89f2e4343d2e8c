#![forbid(unsafe_code)]

//! Observable input value with change notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] keeps a value in shared `Rc<RefCell<..>>` storage. A
//! `set` that changes the value (by `PartialEq`) bumps the version and calls
//! every live subscriber in registration order. Hosts write observer inputs
//! through observables; the observer subscribes to learn that it must
//! reconfigure.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: calling `set()` on the same observable from inside
//!   one of its subscribers panics (RefCell borrow rules). Subscribers in this
//!   crate only flip flags, so they never re-enter.
//! - **Subscriber leak**: a [`Subscription`] kept forever keeps its callback
//!   alive. Dead weak entries are pruned on the next `notify()`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    /// Weak subscriber list; dead entries are pruned on notify.
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` yields another handle to the same state.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable at version 0 with no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value. No-op when equal to the current value; otherwise
    /// bumps the version and notifies subscribers.
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly from one of this observable's
    /// subscribers.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Register a change callback. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.inner.borrow_mut().subscribers.push(weak);
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of value-changing mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn notify(&self) {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(Weak::upgrade)
                .collect()
        };

        let value = self.inner.borrow().value.clone();
        for cb in &callbacks {
            cb(&value);
        }
    }
}

/// RAII guard for a subscriber callback.
///
/// Holds the only strong reference to the callback; once dropped, the weak
/// entry in the source fails to upgrade and the callback is never called
/// again.
pub struct Subscription {
    pub(crate) _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use viewobs_core::{RootMargin, Threshold};

    #[test]
    fn set_bumps_version_once_per_change() {
        let threshold = Observable::new(Threshold::default());
        assert_eq!(threshold.version(), 0);

        threshold.set(Threshold::Single(0.5));
        assert_eq!(threshold.version(), 1);
        assert_eq!(threshold.get(), Threshold::Single(0.5));

        threshold.set(Threshold::Single(0.5));
        assert_eq!(threshold.version(), 1);
    }

    #[test]
    fn subscribers_see_new_value() {
        let margin = Observable::new(RootMargin::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = margin.subscribe(move |m: &RootMargin| s.borrow_mut().push(m.to_string()));

        margin.set("10px".into());
        margin.set("10px".into());
        margin.set("-5%".into());
        assert_eq!(*seen.borrow(), vec!["10px".to_string(), "-5%".to_string()]);
    }

    #[test]
    fn subscribers_fire_in_registration_order() {
        let obs = Observable::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<_> = (0..3)
            .map(|i| {
                let o = Rc::clone(&order);
                obs.subscribe(move |_| o.borrow_mut().push(i))
            })
            .collect();

        obs.set(1);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn dropped_subscription_stops_delivery_and_is_pruned() {
        let obs = Observable::new(None::<String>);
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let sub = obs.subscribe(move |_| c.set(c.get() + 1));

        obs.set(Some(".a".into()));
        assert_eq!(count.get(), 1);

        drop(sub);
        assert_eq!(obs.subscriber_count(), 1);
        obs.set(None);
        assert_eq!(count.get(), 1);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn clones_share_state() {
        let a = Observable::new(1);
        let b = a.clone();
        b.set(2);
        assert_eq!(a.get(), 2);
        assert_eq!(a.version(), 1);
    }

    #[test]
    fn with_borrows_without_clone() {
        let obs = Observable::new(vec![0.0, 0.5, 1.0]);
        assert_eq!(obs.with(Vec::len), 3);
    }

    #[test]
    fn debug_shows_version() {
        let obs = Observable::new(3);
        obs.set(4);
        let debug = format!("{obs:?}");
        assert!(debug.contains("version: 1"));
    }
}
