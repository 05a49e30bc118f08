//! Corrective scrolling for off-screen elements.
//!
//! [`ScrollRecovery::scroll_once`] drags a finger vertically along the
//! horizontal centre of the viewport, from 70% to 30% of its height by
//! default, then pauses so momentum and animations settle. It does not check
//! whether anything appeared; the resolver re-runs its pass for that.
//!
//! Scrolls are not reversible and repeated calls keep moving in the same
//! direction, so callers bound how often they scroll (the resolver scrolls at
//! most once per resolve).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScrollConfig;
use crate::element::{GestureSpec, Point, Viewport};
use crate::session::{DeviceSession, SessionError};

/// Which way the content moves into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Reveal content below the viewport (finger moves up).
    #[default]
    Down,
    /// Reveal content above the viewport (finger moves down).
    Up,
}

/// Issues bounded scroll gestures through a session.
#[derive(Debug, Clone, Default)]
pub struct ScrollRecovery {
    config: ScrollConfig,
}

impl ScrollRecovery {
    pub fn new(config: ScrollConfig) -> Self {
        Self { config }
    }

    /// Computes the gesture for one scroll in `direction` within `viewport`.
    pub fn gesture_for(&self, viewport: Viewport, direction: Direction) -> GestureSpec {
        let x = viewport.width / 2;
        let at = |ratio: f64| (f64::from(viewport.height) * ratio) as i32;
        let (from, to) = match direction {
            Direction::Down => (at(self.config.start_ratio), at(self.config.end_ratio)),
            Direction::Up => (at(self.config.end_ratio), at(self.config.start_ratio)),
        };
        GestureSpec {
            start: Point::new(x, from),
            end: Point::new(x, to),
            duration: Duration::from_millis(self.config.gesture_ms),
        }
    }

    /// Performs one scroll and waits for the settle delay.
    pub async fn scroll_once(
        &self,
        session: &dyn DeviceSession,
        direction: Direction,
    ) -> Result<(), SessionError> {
        let viewport = session.viewport().await?;
        let gesture = self.gesture_for(viewport, direction);
        debug!(
            ?direction,
            from_y = gesture.start.y,
            to_y = gesture.end.y,
            "scrolling"
        );
        session.perform_gesture(&gesture).await?;
        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        Ok(())
    }
}
