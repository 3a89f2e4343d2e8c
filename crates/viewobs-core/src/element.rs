//! Element handles and root resolution.

use std::fmt;

use crate::options::ResolvedRoot;

/// A non-owning handle to an element in the host tree.
///
/// Handles are cheap to clone and compare by identity. The host owns the
/// element; a handle only has to stay valid for the observer's lifetime.
pub trait ObservedElement: Clone + PartialEq + fmt::Debug + 'static {
    /// The nearest element, starting with `self` and walking up through its
    /// ancestors, that matches `selector`.
    ///
    /// Unmatched and unparseable selectors both yield `None`.
    fn closest(&self, selector: &str) -> Option<Self>;
}

/// Resolve the root region for `target`.
///
/// An absent or empty selector, or one that matches nothing, resolves to the
/// viewport. The lookup runs against the tree as it is right now; nothing is
/// cached for later mutations.
pub fn resolve_root<E: ObservedElement>(target: &E, selector: Option<&str>) -> ResolvedRoot<E> {
    let Some(selector) = selector.filter(|s| !s.is_empty()) else {
        return ResolvedRoot::Viewport;
    };
    match target.closest(selector) {
        Some(ancestor) => ResolvedRoot::Ancestor(ancestor),
        None => {
            crate::logging::debug!(selector, "ancestor selector matched nothing; using viewport");
            ResolvedRoot::Viewport
        }
    }
}
