#![forbid(unsafe_code)]

//! Element tree fixtures.
//!
//! Time is driven with [`ManualClock`], re-exported from the runtime so the
//! same clock stamps batch arrivals and feeds `step`.

use std::rc::Rc;
use std::time::Duration;

use viewobs_core::dom::{DomTree, NodeRef};
pub use viewobs_runtime::ManualClock;

/// Milliseconds as a `Duration`.
#[must_use]
pub const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// A scroll container holding one target:
///
/// ```text
/// section.page
/// └── div.ancestor#list
///     └── div#target
/// ```
#[derive(Debug, Clone)]
pub struct Fixture {
    pub tree: Rc<DomTree>,
    pub page: NodeRef,
    pub ancestor: NodeRef,
    pub target: NodeRef,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    #[must_use]
    pub fn new() -> Self {
        let tree = DomTree::new();
        let page = tree.create_element("section").with_class("page");
        let ancestor = tree
            .create_element("div")
            .with_class("ancestor")
            .with_id("list");
        let target = tree.create_element("div").with_id("target");
        page.append_child(&ancestor);
        ancestor.append_child(&target);
        Self {
            tree,
            page,
            ancestor,
            target,
        }
    }

    /// A second target under the same ancestor.
    #[must_use]
    pub fn sibling(&self) -> NodeRef {
        let sibling = self.tree.create_element("div").with_id("sibling");
        self.ancestor.append_child(&sibling);
        sibling
    }
}
