//! Observation options.
//!
//! [`ObservationConfig`] is the host-facing snapshot (what the consumer
//! configured). [`ObserverOptions`] is what a single capability handle is
//! created with: the same threshold and margin plus the root that was resolved
//! from the ancestor selector at reconfiguration time.
//!
//! # Invariants
//!
//! 1. A config is replaced as a whole; nothing in this module mutates a
//!    snapshot that a live handle was created from.
//! 2. Threshold and margin values are carried verbatim. Range or syntax
//!    checking belongs to the capability that consumes them.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Threshold used when the host does not configure one.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Root margin used when the host does not configure one.
pub const DEFAULT_ROOT_MARGIN: &str = "0px";

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

/// Ratio (or ordered ratios) of the target area that must be visible for the
/// capability to report a crossing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum Threshold {
    /// A single ratio in `0.0..=1.0`.
    Single(f64),
    /// An ordered list of ratios; a crossing of any of them fires.
    List(Vec<f64>),
}

impl Threshold {
    /// The configured ratios, in order.
    #[must_use]
    pub fn ratios(&self) -> &[f64] {
        match self {
            Self::Single(ratio) => std::slice::from_ref(ratio),
            Self::List(ratios) => ratios,
        }
    }

    /// Whether the threshold was given as a list (even a one-element list).
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::Single(DEFAULT_THRESHOLD)
    }
}

impl From<f64> for Threshold {
    fn from(ratio: f64) -> Self {
        Self::Single(ratio)
    }
}

impl From<Vec<f64>> for Threshold {
    fn from(ratios: Vec<f64>) -> Self {
        Self::List(ratios)
    }
}

impl From<&[f64]> for Threshold {
    fn from(ratios: &[f64]) -> Self {
        Self::List(ratios.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Threshold {
    fn from(ratios: [f64; N]) -> Self {
        Self::List(ratios.to_vec())
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ratio) => write!(f, "{ratio}"),
            Self::List(ratios) => {
                f.write_str("[")?;
                for (i, ratio) in ratios.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ratio}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RootMargin
// ---------------------------------------------------------------------------

/// CSS-margin-like offset applied to the root region (`"10px 0px"`, `"-5%"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct RootMargin(String);

impl RootMargin {
    /// Wrap a margin string without validating it.
    #[must_use]
    pub fn new(margin: impl Into<String>) -> Self {
        Self(margin.into())
    }

    /// The margin as the capability will receive it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self(DEFAULT_ROOT_MARGIN.to_owned())
    }
}

impl From<&str> for RootMargin {
    fn from(margin: &str) -> Self {
        Self::new(margin)
    }
}

impl From<String> for RootMargin {
    fn from(margin: String) -> Self {
        Self(margin)
    }
}

impl AsRef<str> for RootMargin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ObservationConfig
// ---------------------------------------------------------------------------

/// Immutable configuration snapshot consumed once per reconfiguration.
///
/// # Example
///
/// ```
/// use viewobs_core::{ObservationConfig, Threshold};
///
/// let config = ObservationConfig::default()
///     .with_threshold([0.0, 0.5, 1.0])
///     .with_root_margin("10px")
///     .with_ancestor_selector(".scroller");
///
/// assert_eq!(config.threshold.ratios(), &[0.0, 0.5, 1.0]);
/// assert_eq!(config.root_margin.as_str(), "10px");
/// assert_eq!(config.ancestor_selector.as_deref(), Some(".scroller"));
/// assert_eq!(ObservationConfig::default().threshold, Threshold::Single(0.1));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct ObservationConfig {
    /// Visible-area ratio(s) that trigger a report. Default: `0.1`.
    pub threshold: Threshold,
    /// Margin applied to the root region. Default: `"0px"`.
    pub root_margin: RootMargin,
    /// Selector for the bounding ancestor. `None` (or empty) means viewport.
    pub ancestor_selector: Option<String>,
}

impl ObservationConfig {
    /// Replace the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: impl Into<Threshold>) -> Self {
        self.threshold = threshold.into();
        self
    }

    /// Replace the root margin.
    #[must_use]
    pub fn with_root_margin(mut self, margin: impl Into<RootMargin>) -> Self {
        self.root_margin = margin.into();
        self
    }

    /// Set the ancestor selector.
    #[must_use]
    pub fn with_ancestor_selector(mut self, selector: impl Into<String>) -> Self {
        self.ancestor_selector = Some(selector.into());
        self
    }

    /// The selector to resolve, treating an empty string as absent.
    #[must_use]
    pub fn effective_selector(&self) -> Option<&str> {
        self.ancestor_selector
            .as_deref()
            .filter(|selector| !selector.is_empty())
    }
}

// ---------------------------------------------------------------------------
// ResolvedRoot / ObserverOptions
// ---------------------------------------------------------------------------

/// The region intersections are computed against.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResolvedRoot<E> {
    /// The top-level viewport (the capability's null root).
    #[default]
    Viewport,
    /// A specific ancestor element.
    Ancestor(E),
}

impl<E> ResolvedRoot<E> {
    /// Whether the root is the viewport.
    #[must_use]
    pub const fn is_viewport(&self) -> bool {
        matches!(self, Self::Viewport)
    }

    /// The ancestor element, if one was resolved.
    #[must_use]
    pub const fn ancestor(&self) -> Option<&E> {
        match self {
            Self::Viewport => None,
            Self::Ancestor(element) => Some(element),
        }
    }
}

/// Options a single capability handle is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions<E> {
    pub root: ResolvedRoot<E>,
    pub threshold: Threshold,
    pub root_margin: RootMargin,
}

impl<E> ObserverOptions<E> {
    /// Combine a resolved root with the threshold and margin of `config`.
    #[must_use]
    pub fn from_config(root: ResolvedRoot<E>, config: &ObservationConfig) -> Self {
        Self {
            root,
            threshold: config.threshold.clone(),
            root_margin: config.root_margin.clone(),
        }
    }
}
