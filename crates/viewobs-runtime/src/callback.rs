#![forbid(unsafe_code)]

//! Raw batch callback.

use std::fmt;
use std::rc::Rc;

use viewobs_core::{IntersectionEntry, ObserverOptions};

/// Description of the handle a batch came from, passed to raw callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleInfo<E> {
    /// Generation token of the handle.
    pub generation: u64,
    /// Options the handle was created with.
    pub options: ObserverOptions<E>,
}

type RawFn<E> = dyn Fn(&[IntersectionEntry], &HandleInfo<E>);

/// Optional consumer of every raw batch.
///
/// Equality is identity: two callbacks are equal only when they are clones of
/// the same `Rc`. That is what lets an `Observable<Option<ObserverCallback>>`
/// notice a replaced callback.
pub struct ObserverCallback<E>(Rc<RawFn<E>>);

impl<E> ObserverCallback<E> {
    /// Wrap a closure.
    pub fn new(f: impl Fn(&[IntersectionEntry], &HandleInfo<E>) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the callback.
    pub fn call(&self, batch: &[IntersectionEntry], info: &HandleInfo<E>) {
        (self.0)(batch, info);
    }
}

impl<E> Clone for ObserverCallback<E> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<E> PartialEq for ObserverCallback<E> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<E> fmt::Debug for ObserverCallback<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObserverCallback")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use viewobs_core::{ObservationConfig, ResolvedRoot};

    #[test]
    fn equality_is_identity() {
        let a: ObserverCallback<u32> = ObserverCallback::new(|_, _| {});
        let b: ObserverCallback<u32> = ObserverCallback::new(|_, _| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn call_passes_batch_and_info() {
        let seen = Rc::new(Cell::new(0usize));
        let s = Rc::clone(&seen);
        let cb = ObserverCallback::new(move |batch: &[IntersectionEntry], info: &HandleInfo<u32>| {
            s.set(batch.len() + info.generation as usize);
        });
        let info = HandleInfo {
            generation: 3,
            options: ObserverOptions::from_config(ResolvedRoot::Viewport, &ObservationConfig::default()),
        };
        cb.call(&[IntersectionEntry::visible(), IntersectionEntry::hidden()], &info);
        assert_eq!(seen.get(), 5);
    }
}
