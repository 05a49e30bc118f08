//! Shared test helpers for mobitest-core integration tests.
//!
//! [`FakeSession`] is a scripted in-memory screen: elements carry the
//! locators that match them, the time they appear, whether they sit below
//! the fold, and how many clicks they reject before accepting one. Time is
//! `tokio::time`, so tests run with `start_paused = true` and the clock only
//! moves when the engine sleeps.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use mobitest_core::config::EngineConfig;
use mobitest_core::element::{ElementHandle, GestureSpec, Viewport};
use mobitest_core::interaction::Interactor;
use mobitest_core::locator::Locator;
use mobitest_core::session::{DeviceSession, SessionError};

pub const VIEWPORT: Viewport = Viewport {
    width: 1080,
    height: 2400,
};

// ---------------------------------------------------------------------------
// FakeElement
// ---------------------------------------------------------------------------

/// One element on the fake screen.
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub id: String,
    pub locators: Vec<Locator>,
    pub text: Option<String>,
    pub placeholder: Option<String>,
    /// Offset from session start at which the element enters the tree.
    /// `None` until something reveals it.
    pub present_from: Option<Duration>,
    pub enabled_after: Duration,
    /// Scrolls needed before the element is inside the viewport.
    pub scrolls_needed: u32,
    /// Present in the tree but never displayed.
    pub hidden: bool,
    /// Clicks rejected with `NotInteractable` before one is accepted.
    pub click_rejections: u32,
    /// Clears that fail with `StaleElement` before one succeeds.
    pub stale_edits: u32,
}

impl FakeElement {
    pub fn new(id: &str, locator: Locator) -> Self {
        Self {
            id: id.to_string(),
            locators: vec![locator],
            text: None,
            placeholder: None,
            present_from: Some(Duration::ZERO),
            enabled_after: Duration::ZERO,
            scrolls_needed: 0,
            hidden: false,
            click_rejections: 0,
            stale_edits: 0,
        }
    }

    pub fn also(mut self, locator: Locator) -> Self {
        self.locators.push(locator);
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn appears_after(mut self, ms: u64) -> Self {
        self.present_from = Some(Duration::from_millis(ms));
        self
    }

    /// Absent until revealed by a click, see [`FakeSession::reveal_on_click`].
    pub fn absent(mut self) -> Self {
        self.present_from = None;
        self
    }

    pub fn enabled_after(mut self, ms: u64) -> Self {
        self.enabled_after = Duration::from_millis(ms);
        self
    }

    pub fn below_fold(mut self) -> Self {
        self.scrolls_needed = 1;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn rejects_clicks(mut self, n: u32) -> Self {
        self.click_rejections = n;
        self
    }

    /// The next `n` clears see a stale handle, as after a re-render.
    pub fn stale_edits(mut self, n: u32) -> Self {
        self.stale_edits = n;
        self
    }
}

// ---------------------------------------------------------------------------
// FakeSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Reveal {
    trigger: String,
    target: String,
    delay: Duration,
}

#[derive(Debug, Default)]
struct FakeState {
    elements: Vec<FakeElement>,
    reveals: Vec<Reveal>,
    scrolls: u32,
    gestures: Vec<GestureSpec>,
    clicks: Vec<String>,
    find_calls: u32,
    disconnected: bool,
    disconnect_after_finds: Option<u32>,
}

pub struct FakeSession {
    origin: Instant,
    state: Mutex<FakeState>,
}

impl FakeSession {
    pub fn new(elements: Vec<FakeElement>) -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(FakeState {
                elements,
                ..FakeState::default()
            }),
        }
    }

    /// Clicking `trigger` makes `target` present `delay_ms` later.
    pub fn reveal_on_click(self, trigger: &str, target: &str, delay_ms: u64) -> Self {
        self.state.lock().unwrap().reveals.push(Reveal {
            trigger: trigger.to_string(),
            target: target.to_string(),
            delay: Duration::from_millis(delay_ms),
        });
        self
    }

    /// Every call from now on fails with `Disconnected`.
    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

    /// Disconnect once `n` element lookups have been served.
    pub fn disconnect_after_finds(self, n: u32) -> Self {
        self.state.lock().unwrap().disconnect_after_finds = Some(n);
        self
    }

    pub fn scrolls(&self) -> u32 {
        self.state.lock().unwrap().scrolls
    }

    pub fn gestures(&self) -> Vec<GestureSpec> {
        self.state.lock().unwrap().gestures.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn find_calls(&self) -> u32 {
        self.state.lock().unwrap().find_calls
    }

    pub fn text_of(&self, id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .elements
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.text.clone())
    }

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn check(&self, state: &FakeState) -> Result<(), SessionError> {
        if state.disconnected {
            return Err(SessionError::Disconnected);
        }
        Ok(())
    }

    fn is_present(&self, element: &FakeElement) -> bool {
        element.present_from.is_some_and(|t| self.now() >= t)
    }

    fn with_element<T>(
        &self,
        handle: &ElementHandle,
        f: impl FnOnce(&mut FakeElement, u32, Duration) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        self.check(&state)?;
        let scrolls = state.scrolls;
        let element = state
            .elements
            .iter_mut()
            .find(|e| e.id == handle.id() && e.present_from.is_some_and(|t| now >= t))
            .ok_or_else(|| SessionError::StaleElement(handle.id().to_string()))?;
        f(element, scrolls, now)
    }

    fn lookup(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let mut state = self.state.lock().unwrap();
        self.check(&state)?;
        state.find_calls += 1;
        if let Some(limit) = state.disconnect_after_finds {
            if state.find_calls > limit {
                state.disconnected = true;
                return Err(SessionError::Disconnected);
            }
        }
        Ok(state
            .elements
            .iter()
            .filter(|e| self.is_present(e) && e.locators.contains(locator))
            .map(|e| ElementHandle::new(e.id.clone()))
            .collect())
    }
}

#[async_trait]
impl DeviceSession for FakeSession {
    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>, SessionError> {
        Ok(self.lookup(locator)?.into_iter().next())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        self.lookup(locator)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        self.with_element(element, |e, scrolls, _| Ok(!e.hidden && scrolls >= e.scrolls_needed))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        self.with_element(element, |e, _, now| Ok(now >= e.enabled_after))
    }

    async fn text(&self, element: &ElementHandle) -> Result<Option<String>, SessionError> {
        self.with_element(element, |e, _, _| {
            Ok(match &e.text {
                Some(t) if !t.is_empty() => Some(t.clone()),
                _ => e.placeholder.clone(),
            })
        })
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.with_element(element, |e, _, _| {
            if e.stale_edits > 0 {
                e.stale_edits -= 1;
                return Err(SessionError::StaleElement(e.id.clone()));
            }
            e.text = None;
            Ok(())
        })
    }

    async fn send_text(&self, element: &ElementHandle, text: &str) -> Result<(), SessionError> {
        self.with_element(element, |e, _, _| {
            e.text.get_or_insert_with(String::new).push_str(text);
            Ok(())
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.with_element(element, |e, _, _| {
            if e.click_rejections > 0 {
                e.click_rejections -= 1;
                return Err(SessionError::NotInteractable(e.id.clone()));
            }
            Ok(())
        })?;

        let now = self.now();
        let mut state = self.state.lock().unwrap();
        state.clicks.push(element.id().to_string());
        let reveals: Vec<Reveal> = state
            .reveals
            .iter()
            .filter(|r| r.trigger == element.id())
            .cloned()
            .collect();
        for reveal in reveals {
            if let Some(target) = state.elements.iter_mut().find(|e| e.id == reveal.target) {
                target.present_from = Some(now + reveal.delay);
            }
        }
        Ok(())
    }

    async fn perform_gesture(&self, gesture: &GestureSpec) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        self.check(&state)?;
        state.gestures.push(gesture.clone());
        state.scrolls += 1;
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport, SessionError> {
        let state = self.state.lock().unwrap();
        self.check(&state)?;
        Ok(VIEWPORT)
    }

    async fn page_source(&self) -> Result<String, SessionError> {
        let state = self.state.lock().unwrap();
        self.check(&state)?;
        let mut xml = String::from("<hierarchy>");
        for e in state.elements.iter().filter(|e| self.is_present(e)) {
            xml.push_str(&format!(
                "<node id=\"{}\" text=\"{}\"/>",
                e.id,
                e.text.as_deref().unwrap_or("")
            ));
        }
        xml.push_str("</hierarchy>");
        Ok(xml)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let state = self.state.lock().unwrap();
        self.check(&state)?;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Engine settings scaled down for fast tests.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        default_timeout_ms: 1_000,
        poll_interval_ms: 100,
        probe_timeout_ms: 300,
        interactable_checks: 3,
        recheck_interval_ms: 200,
        checkout_timeout_ms: 2_000,
        ..EngineConfig::default()
    }
}

/// An interactor over `session` using [`test_config`].
pub fn interactor(session: &Arc<FakeSession>) -> Interactor {
    let session: Arc<dyn DeviceSession> = session.clone();
    Interactor::new(session, test_config())
}
