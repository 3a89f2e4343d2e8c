//! Logging facade.
//!
//! With the `tracing` feature enabled the usual `tracing` macros are
//! re-exported at the crate root. Without it the same macro names expand to
//! nothing, so call sites never need their own `#[cfg]` guards.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __viewobs_log_noop {
    ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "tracing"))]
pub use crate::__viewobs_log_noop as debug;
#[cfg(not(feature = "tracing"))]
pub use crate::__viewobs_log_noop as trace;
#[cfg(not(feature = "tracing"))]
pub use crate::__viewobs_log_noop as warn;
