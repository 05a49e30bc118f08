//! Engine-level error taxonomy.
//!
//! Absence is not an error in this crate: "not found" is an `Option::None`
//! from the resolver and "deadline exceeded" is [`Waited::DeadlineExceeded`](crate::wait::Waited)
//! from the wait engine. [`EngineError`] covers the conditions that must
//! propagate to the scenario: interaction failures, session faults and
//! misconfiguration.

use thiserror::Error;

use crate::session::SessionError;

/// Errors surfaced by the interaction layer and the checkout flow.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A strategy that the caller required could not be resolved, even after
    /// the recovery scroll.
    #[error("Element not found: no locator in strategy '{strategy}' matched a visible element")]
    ElementNotFound {
        /// Name of the strategy that was exhausted.
        strategy: String,
    },

    /// The element was located but never became actionable.
    #[error("Element '{strategy}' not interactable after {attempts} checks")]
    ElementNotInteractable {
        /// Name of the strategy that resolved the element.
        strategy: String,
        /// How many visibility/enabled re-checks were made.
        attempts: u32,
    },

    /// A driver or session level failure. Always fatal.
    #[error("Session fault: {0}")]
    Session(#[from] SessionError),

    /// A wait specification violated `0 < poll_interval < timeout`.
    #[error("Invalid wait spec: {0}")]
    InvalidWaitSpec(String),

    /// A locator strategy failed validation.
    #[error("Invalid locator strategy: {0}")]
    InvalidStrategy(String),

    /// A state machine operation was called in the wrong state.
    #[error("Invalid state: expected {expected}, was {actual}")]
    InvalidState {
        /// The state the operation requires.
        expected: &'static str,
        /// The state the machine was actually in.
        actual: &'static str,
    },

    /// Configuration could not be loaded or failed validation.
    #[error("Config error: {0}")]
    Config(String),
}

impl EngineError {
    /// Returns true when this error wraps a fatal session fault.
    pub fn is_session_fault(&self) -> bool {
        matches!(self, EngineError::Session(e) if e.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::ElementNotFound {
            strategy: "finish-button".to_string(),
        };
        assert!(err.to_string().contains("finish-button"));

        let err = EngineError::ElementNotInteractable {
            strategy: "continue".to_string(),
            attempts: 3,
        };
        assert!(err.to_string().contains("after 3 checks"));

        let err = EngineError::InvalidState {
            expected: "FormEntry",
            actual: "Advanced",
        };
        assert!(err.to_string().contains("expected FormEntry"));
    }

    #[test]
    fn test_session_fault_classification() {
        let err: EngineError = SessionError::Disconnected.into();
        assert!(err.is_session_fault());

        let err: EngineError = SessionError::StaleElement("el-1".to_string()).into();
        assert!(!err.is_session_fault());

        let err = EngineError::ElementNotFound {
            strategy: "x".to_string(),
        };
        assert!(!err.is_session_fault());
    }
}
