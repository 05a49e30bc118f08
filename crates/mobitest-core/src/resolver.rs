//! Ordered fallback resolution of locator strategies.
//!
//! The [`ElementResolver`] turns a [`LocatorStrategy`] into a handle to a
//! currently *visible* element:
//!
//! 1. A pass probes each locator once, in priority order, without waiting.
//!    The first locator whose element is displayed wins, even if a later one
//!    would also match. Elements that are present in the tree but hidden or
//!    off-screen, and stale handles, count as misses.
//! 2. If the first pass misses, one recovery scroll is issued straight away.
//! 3. Passes are then repeated through the [`WaitEngine`] for the rest of the
//!    timeout, so the wait cost is paid once per strategy rather than once per
//!    locator. No further scroll is made.
//!
//! Absence is returned as `Ok(None)`; the caller decides whether that is
//! expected (probing for an error banner) or fatal (a required control).
//! Session faults propagate immediately.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, debug_span, Instrument};

use crate::config::EngineConfig;
use crate::element::ElementHandle;
use crate::locator::{Locator, LocatorStrategy};
use crate::scroll::{Direction, ScrollRecovery};
use crate::session::{DeviceSession, SessionError};
use crate::wait::{WaitEngine, WaitSpec};

/// What to do when the first pass misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Scroll once in the given direction, then keep polling.
    ScrollOnce(Direction),
    /// Poll for the whole timeout without touching the screen.
    None,
}

impl Default for Recovery {
    fn default() -> Self {
        Recovery::ScrollOnce(Direction::Down)
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub handle: ElementHandle,
    /// The locator that produced the element.
    pub locator: Locator,
    /// Position of that locator in the strategy (0 = highest priority).
    pub rank: usize,
    /// Whether the recovery scroll was needed.
    pub recovered: bool,
}

/// Resolves strategies against a device session.
#[derive(Debug, Clone)]
pub struct ElementResolver {
    poll_interval: Duration,
    scroll: ScrollRecovery,
}

impl ElementResolver {
    pub fn new(poll_interval: Duration, scroll: ScrollRecovery) -> Self {
        Self {
            poll_interval,
            scroll,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.poll_interval(), ScrollRecovery::new(config.scroll.clone()))
    }

    pub fn scroll(&self) -> &ScrollRecovery {
        &self.scroll
    }

    /// One pass over the strategy with no waiting and no recovery.
    pub async fn probe(
        &self,
        session: &dyn DeviceSession,
        strategy: &LocatorStrategy,
    ) -> Result<Option<ResolvedElement>, SessionError> {
        for (rank, locator) in strategy.locators().iter().enumerate() {
            let handle = match session.find_element(locator).await {
                Ok(Some(handle)) => handle,
                Ok(None) => {
                    debug!(%locator, rank, "no match");
                    continue;
                }
                Err(e) if !e.is_fatal() => {
                    debug!(%locator, rank, error = %e, "lookup failed, trying next locator");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match session.is_displayed(&handle).await {
                Ok(true) => {
                    debug!(%locator, rank, element = %handle, "resolved");
                    return Ok(Some(ResolvedElement {
                        handle,
                        locator: locator.clone(),
                        rank,
                        recovered: false,
                    }));
                }
                Ok(false) => debug!(%locator, rank, "present but not displayed"),
                Err(e) if !e.is_fatal() => {
                    debug!(%locator, rank, error = %e, "visibility check failed, trying next locator")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Resolves with the default recovery (one downward scroll).
    pub async fn resolve(
        &self,
        session: &dyn DeviceSession,
        strategy: &LocatorStrategy,
        timeout: Duration,
    ) -> Result<Option<ResolvedElement>, SessionError> {
        self.resolve_with(session, strategy, timeout, Recovery::default())
            .await
    }

    /// Resolves `strategy` within `timeout`.
    ///
    /// With [`Recovery::ScrollOnce`] a single pass is made first; if it
    /// misses, the recovery scroll is issued at once and passes are polled
    /// for whatever remains of `timeout`, without scrolling again. With
    /// [`Recovery::None`] passes are polled for the whole `timeout`. Whenever
    /// the time left is no longer than one poll interval, a single pass is
    /// made instead of polling.
    pub async fn resolve_with(
        &self,
        session: &dyn DeviceSession,
        strategy: &LocatorStrategy,
        timeout: Duration,
        recovery: Recovery,
    ) -> Result<Option<ResolvedElement>, SessionError> {
        let span = debug_span!(
            "resolve",
            strategy = strategy.name(),
            timeout_ms = timeout.as_millis() as u64
        );
        async {
            let start = Instant::now();
            let direction = match recovery {
                Recovery::ScrollOnce(direction) => direction,
                Recovery::None => {
                    let found = self.poll(session, strategy, timeout).await?;
                    if found.is_none() {
                        debug!("strategy exhausted");
                    }
                    return Ok(found);
                }
            };

            if let Some(found) = self.probe(session, strategy).await? {
                return Ok(Some(found));
            }

            debug!(?direction, "first pass missed, scrolling once");
            self.scroll.scroll_once(session, direction).await?;
            let remaining = timeout.saturating_sub(start.elapsed());
            let found = self
                .poll(session, strategy, remaining)
                .await?
                .map(|mut resolved| {
                    resolved.recovered = true;
                    resolved
                });
            if found.is_none() {
                debug!("not found after recovery scroll");
            }
            Ok(found)
        }
        .instrument(span)
        .await
    }

    /// Repeats passes until one resolves or `budget` runs out.
    async fn poll(
        &self,
        session: &dyn DeviceSession,
        strategy: &LocatorStrategy,
        budget: Duration,
    ) -> Result<Option<ResolvedElement>, SessionError> {
        match WaitSpec::new(budget, self.poll_interval) {
            Ok(spec) => Ok(WaitEngine::until(&spec, move || self.probe(session, strategy))
                .await?
                .into_option()),
            Err(_) => self.probe(session, strategy).await,
        }
    }
}

impl Default for ElementResolver {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
