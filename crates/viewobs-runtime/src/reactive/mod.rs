#![forbid(unsafe_code)]

//! Reactive primitives backing the observer's inputs and output.
//!
//! - [`Observable`]: a shared, version-tracked input value; subscribers are
//!   told when it changes. The observer's `threshold`, `root_margin`,
//!   `ancestor_selector`, `observer_callback`, and target are observables.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Binding`]: a lazily evaluated read of one or more observables, used to
//!   snapshot the current configuration.
//! - [`BindingScope`]: owns every subscription a single observer made, so
//!   teardown releases them in one step.
//! - [`Output`]: an event stream. Unlike `Observable`, every `emit` reaches
//!   subscribers, including repeats of the previous value.
//!
//! # Architecture
//!
//! Everything is single-threaded: shared state lives in `Rc<RefCell<..>>`,
//! callbacks are held strongly by their guards and weakly by the source, and
//! dead callbacks are pruned lazily on the next notification.
//!
//! # Invariants
//!
//! 1. `Observable` version increments exactly once per value-changing set.
//! 2. Subscribers are notified in registration order.
//! 3. Setting an `Observable` to its current value is a no-op.
//! 4. Dropping a [`Subscription`] stops delivery before the next notification.
//! 5. A detached [`Output`] drops every later emission.

pub mod binding;
pub mod observable;
pub mod output;

pub use binding::{Binding, BindingScope};
pub use observable::{Observable, Subscription};
pub use output::Output;
