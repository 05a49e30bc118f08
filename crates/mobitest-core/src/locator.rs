//! Typed locators and ordered locator strategies.
//!
//! A [`Locator`] is one query the device session understands. A
//! [`LocatorStrategy`] is a named, ordered list of locators tried in priority
//! order: the first locator that yields a *visible* element wins, even when a
//! later one would also match. Order encodes confidence, most specific first.
//!
//! # Example
//!
//! ```
//! use mobitest_core::locator::{Locator, LocatorStrategy};
//!
//! let finish = LocatorStrategy::single("finish-button", Locator::accessibility_id("test-FINISH"))
//!     .or(Locator::xpath("//*[contains(@text, 'FINISH')]"))
//!     .or(Locator::xpath("//*[contains(@content-desc, 'FINISH')]"));
//!
//! assert_eq!(finish.len(), 3);
//! assert!(finish.validate().is_ok());
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A single element query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value")]
pub enum Locator {
    /// Accessibility identifier (`content-desc` on Android).
    #[serde(rename = "accessibility_id")]
    AccessibilityId(String),

    /// XPath expression evaluated against the page source.
    #[serde(rename = "xpath")]
    XPath(String),

    /// Platform resource id (e.g. `com.android.settings:id/homepage_title`).
    #[serde(rename = "id")]
    ElementId(String),
}

impl Locator {
    /// Creates an accessibility-id locator.
    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Locator::AccessibilityId(value.into())
    }

    /// Creates an XPath locator.
    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    /// Creates a resource-id locator.
    pub fn element_id(value: impl Into<String>) -> Self {
        Locator::ElementId(value.into())
    }

    /// Short name of the locator kind, for tracing fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Locator::AccessibilityId(_) => "accessibility_id",
            Locator::XPath(_) => "xpath",
            Locator::ElementId(_) => "id",
        }
    }

    /// The raw query string.
    pub fn value(&self) -> &str {
        match self {
            Locator::AccessibilityId(v) | Locator::XPath(v) | Locator::ElementId(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind(), self.value())
    }
}

/// A named, ordered, non-empty sequence of locators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStrategy {
    name: String,
    locators: Vec<Locator>,
}

impl LocatorStrategy {
    /// Builds a validated strategy.
    ///
    /// Fails when the list is empty, a locator value is blank, or the same
    /// locator appears twice.
    pub fn new(name: impl Into<String>, locators: Vec<Locator>) -> Result<Self, EngineError> {
        let strategy = Self {
            name: name.into(),
            locators,
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// A strategy with one locator. Extend it with [`or`](Self::or).
    pub fn single(name: impl Into<String>, locator: Locator) -> Self {
        Self {
            name: name.into(),
            locators: vec![locator],
        }
    }

    /// Appends a lower-priority fallback.
    pub fn or(mut self, locator: Locator) -> Self {
        self.locators.push(locator);
        self
    }

    /// Checks the invariants enforced by [`new`](Self::new).
    ///
    /// Strategies deserialized from config or assembled with
    /// [`or`](Self::or) should be validated once at startup.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvalidStrategy(
                "strategy name must not be empty".to_string(),
            ));
        }
        if self.locators.is_empty() {
            return Err(EngineError::InvalidStrategy(format!(
                "strategy '{}' has no locators",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for locator in &self.locators {
            if locator.value().trim().is_empty() {
                return Err(EngineError::InvalidStrategy(format!(
                    "strategy '{}' contains an empty {} locator",
                    self.name,
                    locator.kind()
                )));
            }
            if !seen.insert(locator) {
                return Err(EngineError::InvalidStrategy(format!(
                    "strategy '{}' lists {} twice",
                    self.name, locator
                )));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Locators in priority order.
    pub fn locators(&self) -> &[Locator] {
        &self.locators
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.name)?;
        for (i, locator) in self.locators.iter().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            write!(f, "{}", locator)?;
        }
        write!(f, "]")
    }
}
