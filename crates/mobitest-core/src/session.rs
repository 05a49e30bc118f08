//! Device session boundary for backend-agnostic UI automation.
//!
//! This module defines the [`DeviceSession`] trait: the opaque capability the
//! engine drives. A real implementation wraps a remote automation server
//! session; tests and the Swag Labs simulator provide in-memory ones. Every
//! engine component takes the session explicitly, there is no ambient driver.
//!
//! A session represents one exclusive device and app surface. Calls are
//! awaited one at a time by the owning scenario; concurrent scenarios must
//! each own their own session.

use async_trait::async_trait;
use thiserror::Error;

use crate::element::{ElementHandle, GestureSpec, Viewport};
use crate::locator::Locator;

/// Errors reported by a device session.
///
/// The variants split into two classes, see [`is_fatal`](Self::is_fatal):
/// session faults that end the scenario, and element-level conditions the
/// engine treats as "not yet visible" or "not yet actionable".
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session is gone (driver quit, app crashed, server restarted).
    #[error("Session disconnected")]
    Disconnected,

    /// The transport to the automation server broke mid-command.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The server rejected or failed a command for a reason unrelated to the
    /// element's state.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The handle no longer refers to an element in the current layout.
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// The element exists but cannot receive the action right now (covered,
    /// disabled, mid-animation).
    #[error("Element not interactable: {0}")]
    NotInteractable(String),
}

impl SessionError {
    /// Fatal errors propagate immediately and are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Disconnected
                | SessionError::ConnectionLost(_)
                | SessionError::CommandFailed(_)
        )
    }
}

/// Trait for a single device automation session.
///
/// # Required Methods
///
/// Implementors must provide every method except
/// [`is_enabled`](DeviceSession::is_enabled), which defaults to `Ok(true)`
/// for backends that cannot report it.
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Look up one element. `Ok(None)` when nothing matches; this call never
    /// waits.
    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>, SessionError>;

    /// Look up every element matching the locator, in document order.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError>;

    /// Whether the element is rendered inside the viewport. Elements present
    /// in the tree but off-screen or hidden report `false`.
    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, SessionError>;

    /// Whether the element accepts input.
    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        let _ = element;
        Ok(true)
    }

    /// The element's text content, `None` if it has none.
    async fn text(&self, element: &ElementHandle) -> Result<Option<String>, SessionError>;

    /// Remove all text from an editable element.
    async fn clear(&self, element: &ElementHandle) -> Result<(), SessionError>;

    /// Type text into an editable element, appending to its content.
    async fn send_text(&self, element: &ElementHandle, text: &str) -> Result<(), SessionError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError>;

    /// Perform a touch drag.
    async fn perform_gesture(&self, gesture: &GestureSpec) -> Result<(), SessionError>;

    /// Current viewport size.
    async fn viewport(&self) -> Result<Viewport, SessionError>;

    /// Serialized UI hierarchy of the current screen.
    async fn page_source(&self) -> Result<String, SessionError>;

    /// Raw PNG bytes of the current screen.
    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;
}
