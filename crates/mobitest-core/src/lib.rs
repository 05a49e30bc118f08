//! # mobitest-core
//!
//! Resilient element resolution and interaction engine for mobile UI tests.
//!
//! Mobile UIs render asynchronously, lay out differently across devices and
//! push controls below the fold. This crate puts a layer between test
//! scenarios and a raw automation session so a scenario does not fail on
//! transient states:
//!
//! - elements are described by ordered fallback locator chains instead of a
//!   single brittle locator;
//! - visibility is awaited through bounded polling, never fixed sleeps;
//! - an element that might be off-screen gets exactly one corrective scroll;
//! - the checkout form's submit is classified as rejected, advanced or timed
//!   out instead of throwing on whichever element happened to be missing.
//!
//! ## Modules
//!
//! - [`locator`] - Locators and ordered fallback strategies
//! - [`session`] - The [`DeviceSession`](session::DeviceSession) trait the engine drives
//! - [`wait`] - Bounded polling against a deadline
//! - [`resolver`] - Strategy resolution with scroll recovery
//! - [`scroll`] - Vertical scroll gestures
//! - [`interaction`] - Click, type and visibility primitives
//! - [`checkout`] - Checkout form submit and outcome classification
//! - [`diagnostics`] - Failure snapshots
//! - [`config`] - Persistent engine settings
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobitest_core::config::EngineConfig;
//! use mobitest_core::interaction::Interactor;
//! use mobitest_core::locator::{Locator, LocatorStrategy};
//! # use mobitest_core::session::DeviceSession;
//!
//! # async fn demo(session: Arc<dyn DeviceSession>) -> Result<(), mobitest_core::error::EngineError> {
//! let ui = Interactor::new(session, EngineConfig::load());
//!
//! let finish = LocatorStrategy::single(
//!     "finish",
//!     Locator::xpath("//android.view.ViewGroup[@content-desc='test-FINISH']"),
//! )
//! .or(Locator::accessibility_id("test-Finish"))
//! .or(Locator::xpath("//*[contains(@text, 'FINISH')]"));
//!
//! ui.click(&finish).await?;
//! # Ok(())
//! # }
//! ```

pub mod checkout;
pub mod config;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod interaction;
pub mod locator;
pub mod resolver;
pub mod scroll;
pub mod session;
pub mod wait;
