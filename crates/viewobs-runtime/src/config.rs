#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! [`RuntimeConfig`] carries the tunables that are not reactive inputs: the
//! debounce window and the initial observation options a new observer starts
//! with. Hosts usually build it in code; with the `policy-config` feature it
//! can also be loaded from TOML or JSON:
//!
//! ```toml
//! debounce_ms = 16
//!
//! [observation]
//! threshold = [0.0, 0.5, 1.0]
//! root_margin = "0px 0px 64px 0px"
//! ancestor_selector = ".feed"
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::fmt;
use std::time::Duration;

use viewobs_core::{ObservationConfig, RootMargin, Threshold};

use crate::debounce::DEFAULT_DEBOUNCE;

/// Non-reactive observer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Quiet window before a raw intersection value is emitted.
    /// Default: 11ms.
    pub debounce: Duration,
    /// Initial values of the observer's reactive inputs.
    pub observation: ObservationConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            observation: ObservationConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Set the debounce window.
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Set the initial threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: impl Into<Threshold>) -> Self {
        self.observation.threshold = threshold.into();
        self
    }

    /// Set the initial root margin.
    #[must_use]
    pub fn with_root_margin(mut self, margin: impl Into<RootMargin>) -> Self {
        self.observation.root_margin = margin.into();
        self
    }

    /// Set the initial ancestor selector.
    #[must_use]
    pub fn with_ancestor_selector(mut self, selector: impl Into<String>) -> Self {
        self.observation.ancestor_selector = Some(selector.into());
        self
    }
}

/// Error loading a [`RuntimeConfig`] from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document did not parse or did not match the expected shape.
    Parse {
        format: &'static str,
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { format, message } => {
                write!(f, "invalid {format} runtime config: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(feature = "policy-config")]
mod loader {
    use super::{ConfigError, RuntimeConfig};
    use serde::Deserialize;
    use std::time::Duration;
    use viewobs_core::ObservationConfig;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct RawConfig {
        debounce_ms: Option<u64>,
        observation: Option<ObservationConfig>,
    }

    impl From<RawConfig> for RuntimeConfig {
        fn from(raw: RawConfig) -> Self {
            let defaults = RuntimeConfig::default();
            Self {
                debounce: raw
                    .debounce_ms
                    .map_or(defaults.debounce, Duration::from_millis),
                observation: raw.observation.unwrap_or(defaults.observation),
            }
        }
    }

    impl RuntimeConfig {
        /// Parse a TOML document.
        ///
        /// # Errors
        ///
        /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
        pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
            toml::from_str::<RawConfig>(text)
                .map(Self::from)
                .map_err(|e| ConfigError::Parse {
                    format: "TOML",
                    message: e.to_string(),
                })
        }

        /// Parse a JSON document.
        ///
        /// # Errors
        ///
        /// Returns [`ConfigError::Parse`] for malformed JSON or unknown keys.
        pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
            serde_json::from_str::<RawConfig>(text)
                .map(Self::from)
                .map_err(|e| ConfigError::Parse {
                    format: "JSON",
                    message: e.to_string(),
                })
        }
    }
}
