#![forbid(unsafe_code)]

//! Bindings and binding scopes.
//!
//! A [`Binding<T>`] is a read-only view over observable state: `get()`
//! re-evaluates on each call, so the value is never stale. The observer uses
//! one to snapshot its [`ObservationConfig`](viewobs_core::ObservationConfig)
//! from the individual input observables at reconfiguration time.
//!
//! A [`BindingScope`] owns the subscriptions of one logical owner. The
//! observer registers its input-change subscriptions in a scope and clears it
//! at teardown, so no input change can reach a destroyed observer.
//!
//! # Invariants
//!
//! 1. `Binding::get()` always reflects the sources' current values.
//! 2. Transforms run on every `get()`; there is no caching.
//! 3. After a scope is cleared or dropped, none of its callbacks fire.

use std::rc::Rc;

use super::observable::{Observable, Subscription};

/// A read-only, lazily evaluated binding.
pub struct Binding<T> {
    eval: Rc<dyn Fn() -> T>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            eval: Rc::clone(&self.eval),
        }
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("value", &self.get())
            .finish()
    }
}

impl<T: 'static> Binding<T> {
    /// Create a binding that evaluates `f` on each `get()`.
    pub fn new(f: impl Fn() -> T + 'static) -> Self {
        Self { eval: Rc::new(f) }
    }

    /// Current bound value.
    #[must_use]
    pub fn get(&self) -> T {
        (self.eval)()
    }
}

/// Subscriptions owned by one observer (or any other logical owner).
///
/// # Invariants
///
/// 1. Dropping the scope releases every held subscription.
/// 2. `clear()` releases immediately; the scope stays usable.
/// 3. `binding_count()` is exact.
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    /// Empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Keep an existing subscription alive for the scope's lifetime.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to `source` and hold the subscription.
    pub fn subscribe<T: Clone + PartialEq + 'static>(
        &mut self,
        source: &Observable<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        let sub = source.subscribe(callback);
        self.subscriptions.push(sub);
        self
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every subscription now.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}
