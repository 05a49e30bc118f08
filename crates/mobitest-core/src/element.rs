//! Element handles and gesture geometry.
//!
//! These types cross the [`DeviceSession`](crate::session::DeviceSession)
//! boundary. Handles are opaque to the engine and are never kept across
//! polling iterations: every poll re-resolves, since a layout change can make
//! an earlier handle stale.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque reference to an element, issued by the device session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Size of the device viewport in screen points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

/// A point in viewport coordinates, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A single-finger drag from `start` to `end` over `duration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureSpec {
    pub start: Point,
    pub end: Point,
    pub duration: Duration,
}

impl GestureSpec {
    /// Vertical travel in points; negative when the finger moves up.
    pub fn dy(&self) -> i32 {
        self.end.y - self.start.y
    }
}
