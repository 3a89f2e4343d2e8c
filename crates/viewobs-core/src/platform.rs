//! Execution environment flag.
//!
//! The observer never inspects its environment on its own. The host injects a
//! [`Platform`] at construction, and the controller checks it on every
//! reconfiguration attempt before touching the capability.

use std::fmt;

/// Where the observer is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    /// An interactive, rendering environment with an intersection capability.
    #[default]
    Browser,
    /// Server-side or pre-rendering execution; nothing is laid out.
    Server,
    /// A background worker without access to layout.
    Worker,
}

impl Platform {
    /// Whether an intersection capability may be used here.
    #[must_use]
    pub const fn supports_observation(self) -> bool {
        matches!(self, Self::Browser)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Server => "server",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
