#![forbid(unsafe_code)]

use std::ops::Deref;

use viewobs_core::ObservedElement;
use web_sys::Element;

/// A DOM element usable as an observation target.
#[derive(Debug, Clone, PartialEq)]
pub struct WebElement(Element);

impl WebElement {
    /// Wrap an element.
    #[must_use]
    pub fn new(element: Element) -> Self {
        Self(element)
    }

    /// The wrapped element.
    #[must_use]
    pub fn as_element(&self) -> &Element {
        &self.0
    }

    /// Unwrap.
    #[must_use]
    pub fn into_inner(self) -> Element {
        self.0
    }
}

impl From<Element> for WebElement {
    fn from(element: Element) -> Self {
        Self(element)
    }
}

impl Deref for WebElement {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.0
    }
}

impl ObservedElement for WebElement {
    /// `Element.closest`; a selector the browser rejects matches nothing.
    fn closest(&self, selector: &str) -> Option<Self> {
        self.0.closest(selector).ok().flatten().map(Self)
    }
}
