//! Safe click and type primitives over a device session.
//!
//! This module provides the [`Interactor`], the scenario-facing entry point of
//! the engine. It holds the session, the engine configuration, an
//! [`ElementResolver`] and a [`DiagnosticRecorder`], and guarantees that every
//! action targets an element that was resolved *visible* first.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobitest_core::config::EngineConfig;
//! use mobitest_core::interaction::Interactor;
//! use mobitest_core::locator::{Locator, LocatorStrategy};
//! use mobitest_core::session::DeviceSession;
//!
//! # async fn demo(session: Arc<dyn DeviceSession>) -> Result<(), mobitest_core::error::EngineError> {
//! let ui = Interactor::new(session, EngineConfig::load());
//!
//! let username = LocatorStrategy::single("username", Locator::accessibility_id("test-Username"));
//! let login = LocatorStrategy::single("login", Locator::accessibility_id("test-LOGIN"));
//!
//! ui.type_text(&username, "standard_user").await?;
//! ui.click(&login).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticRecorder, Snapshot};
use crate::element::ElementHandle;
use crate::error::EngineError;
use crate::locator::LocatorStrategy;
use crate::resolver::{ElementResolver, Recovery, ResolvedElement};
use crate::scroll::Direction;
use crate::session::{DeviceSession, SessionError};

/// Maps a session error raised while acting on a resolved element.
fn interaction_error(strategy: &LocatorStrategy, err: SessionError, attempts: u32) -> EngineError {
    if err.is_fatal() {
        EngineError::Session(err)
    } else {
        EngineError::ElementNotInteractable {
            strategy: strategy.name().to_string(),
            attempts,
        }
    }
}

/// Executes interactions against one device session.
///
/// The interactor owns the session for the lifetime of a scenario; clone the
/// `Arc` only within that scenario.
pub struct Interactor {
    session: Arc<dyn DeviceSession>,
    config: EngineConfig,
    resolver: ElementResolver,
    recorder: DiagnosticRecorder,
}

impl Interactor {
    pub fn new(session: Arc<dyn DeviceSession>, config: EngineConfig) -> Self {
        let resolver = ElementResolver::from_config(&config);
        let recorder = DiagnosticRecorder::new(config.snapshot_dir.clone(), config.snapshot_history);
        Self {
            session,
            config,
            resolver,
            recorder,
        }
    }

    pub fn session(&self) -> &dyn DeviceSession {
        self.session.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ElementResolver {
        &self.resolver
    }

    pub fn recorder(&self) -> &DiagnosticRecorder {
        &self.recorder
    }

    /// Captures a diagnostic snapshot of the current screen.
    pub async fn capture(&self, label: &str) -> Snapshot {
        self.recorder.capture(self.session(), label).await
    }

    /// Captures a snapshot, then hands back `err` for propagation.
    async fn fail(&self, label: &str, err: EngineError) -> EngineError {
        self.capture(label).await;
        err
    }

    /// Resolves `strategy` with the default timeout and one recovery scroll.
    pub async fn resolve(
        &self,
        strategy: &LocatorStrategy,
    ) -> Result<Option<ResolvedElement>, EngineError> {
        Ok(self
            .resolver
            .resolve(self.session(), strategy, self.config.default_timeout())
            .await?)
    }

    /// Resolves a strategy the scenario cannot proceed without.
    async fn require(
        &self,
        strategy: &LocatorStrategy,
        action: &str,
    ) -> Result<ResolvedElement, EngineError> {
        let label = format!("{}_failed_{}", action, strategy.name());
        match self.resolve(strategy).await {
            Ok(Some(resolved)) => Ok(resolved),
            Ok(None) => Err(self
                .fail(
                    &label,
                    EngineError::ElementNotFound {
                        strategy: strategy.name().to_string(),
                    },
                )
                .await),
            Err(e) => Err(self.fail(&label, e).await),
        }
    }

    /// Clicks the element once it is visible and actionable.
    ///
    /// The element is re-checked up to `interactable_checks` times, pausing
    /// `recheck_interval` between checks and re-resolving each time, to ride
    /// out elements that appear before they finish animating.
    pub async fn click(&self, strategy: &LocatorStrategy) -> Result<(), EngineError> {
        let span = info_span!("click", strategy = strategy.name());
        async {
            let checks = self.config.interactable_checks.max(1);
            let mut current = Some(self.require(strategy, "click").await?);

            for attempt in 1..=checks {
                if let Some(resolved) = current.take() {
                    match self.try_click(&resolved.handle).await {
                        Ok(true) => {
                            debug!(attempt, locator = %resolved.locator, "clicked");
                            return Ok(());
                        }
                        Ok(false) => debug!(attempt, "element not yet actionable"),
                        Err(e) if !e.is_fatal() => debug!(attempt, error = %e, "click rejected"),
                        Err(e) => {
                            let label = format!("click_failed_{}", strategy.name());
                            return Err(self.fail(&label, e.into()).await);
                        }
                    }
                } else {
                    debug!(attempt, "element vanished between checks");
                }

                if attempt < checks {
                    tokio::time::sleep(self.config.recheck_interval()).await;
                    current = match self.resolver.probe(self.session(), strategy).await {
                        Ok(found) => found,
                        Err(e) => {
                            let label = format!("click_failed_{}", strategy.name());
                            return Err(self.fail(&label, e.into()).await);
                        }
                    };
                }
            }

            let label = format!("click_failed_{}", strategy.name());
            Err(self
                .fail(
                    &label,
                    EngineError::ElementNotInteractable {
                        strategy: strategy.name().to_string(),
                        attempts: checks,
                    },
                )
                .await)
        }
        .instrument(span)
        .await
    }

    /// `Ok(false)` when the element is not (yet) displayed and enabled.
    async fn try_click(&self, handle: &ElementHandle) -> Result<bool, SessionError> {
        if !self.session.is_displayed(handle).await? {
            return Ok(false);
        }
        if !self.session.is_enabled(handle).await? {
            return Ok(false);
        }
        self.session.click(handle).await?;
        Ok(true)
    }

    /// Replaces the element's content with `text`.
    ///
    /// Existing content is always cleared first; there is no append mode. If
    /// the element goes stale or rejects the edit, it is re-resolved with one
    /// pass and the edit is retried once.
    pub async fn type_text(&self, strategy: &LocatorStrategy, text: &str) -> Result<(), EngineError> {
        let span = info_span!("type_text", strategy = strategy.name(), len = text.len());
        async {
            let label = format!("type_failed_{}", strategy.name());
            let resolved = self.require(strategy, "type").await?;

            let err = match self.replace_text(&resolved.handle, text).await {
                Ok(()) => {
                    debug!(locator = %resolved.locator, "text entered");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => return Err(self.fail(&label, e.into()).await),
                Err(e) => e,
            };

            debug!(error = %err, "edit rejected, re-resolving once");
            let retried = match self.resolver.probe(self.session(), strategy).await {
                Ok(Some(fresh)) => self.replace_text(&fresh.handle, text).await,
                Ok(None) => Err(err),
                Err(e) => Err(e),
            };
            match retried {
                Ok(()) => {
                    debug!("text entered after re-resolve");
                    Ok(())
                }
                Err(e) => Err(self.fail(&label, interaction_error(strategy, e, 2)).await),
            }
        }
        .instrument(span)
        .await
    }

    async fn replace_text(&self, handle: &ElementHandle, text: &str) -> Result<(), SessionError> {
        self.session.clear(handle).await?;
        self.session.send_text(handle, text).await
    }

    /// Reads the element's text, waiting up to the probe timeout for it to
    /// appear. Never scrolls. `Ok(None)` when the element is not visible or
    /// has no text.
    pub async fn read_text(&self, strategy: &LocatorStrategy) -> Result<Option<String>, EngineError> {
        let found = self
            .resolver
            .resolve_with(
                self.session(),
                strategy,
                self.config.probe_timeout(),
                Recovery::None,
            )
            .await?;
        self.text_of(strategy, found).await
    }

    /// Single-pass [`read_text`](Self::read_text) for elements expected on
    /// screen already.
    pub(crate) async fn read_text_now(
        &self,
        strategy: &LocatorStrategy,
    ) -> Result<Option<String>, EngineError> {
        let found = self.resolver.probe(self.session(), strategy).await?;
        self.text_of(strategy, found).await
    }

    async fn text_of(
        &self,
        strategy: &LocatorStrategy,
        found: Option<ResolvedElement>,
    ) -> Result<Option<String>, EngineError> {
        let Some(resolved) = found else {
            debug!(strategy = strategy.name(), "read_text: not visible");
            return Ok(None);
        };
        match self.session.text(&resolved.handle).await {
            Ok(text) => Ok(text),
            Err(e) if !e.is_fatal() => {
                debug!(strategy = strategy.name(), error = %e, "read_text: element went stale");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lenient visibility probe that never fails.
    ///
    /// Waits up to the probe timeout without scrolling. Every failure, a
    /// session fault included, is reported as `false`; faults are logged at
    /// `warn` so they can be told apart from ordinary absence. Use
    /// [`check_visible`](Self::check_visible) to have faults propagate.
    pub async fn is_visible(&self, strategy: &LocatorStrategy) -> bool {
        match self.check_visible(strategy).await {
            Ok(visible) => visible,
            Err(e) => {
                warn!(strategy = strategy.name(), error = %e, "visibility probe failed, reporting not visible");
                false
            }
        }
    }

    /// Strict visibility probe: `Ok(false)` for absence, `Err` for session faults.
    pub async fn check_visible(&self, strategy: &LocatorStrategy) -> Result<bool, EngineError> {
        let found = self
            .resolver
            .resolve_with(
                self.session(),
                strategy,
                self.config.probe_timeout(),
                Recovery::None,
            )
            .await?;
        if found.is_none() {
            debug!(strategy = strategy.name(), "not visible");
        }
        Ok(found.is_some())
    }

    /// Number of elements matched by the first locator that matches any.
    pub async fn count(&self, strategy: &LocatorStrategy) -> Result<usize, EngineError> {
        for locator in strategy.locators() {
            match self.session.find_elements(locator).await {
                Ok(found) if !found.is_empty() => return Ok(found.len()),
                Ok(_) => {}
                Err(e) if !e.is_fatal() => debug!(%locator, error = %e, "count lookup failed"),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(0)
    }

    /// Scrolls once in `direction`.
    pub async fn scroll_once(&self, direction: Direction) -> Result<(), EngineError> {
        Ok(self
            .resolver
            .scroll()
            .scroll_once(self.session(), direction)
            .await?)
    }

    /// Case-insensitive search of the page source; returns the first needle
    /// found.
    pub async fn page_contains(&self, needles: &[&str]) -> Result<Option<String>, EngineError> {
        let source = self.session.page_source().await?.to_lowercase();
        Ok(needles
            .iter()
            .find(|needle| source.contains(&needle.to_lowercase()))
            .map(|needle| needle.to_string()))
    }
}
