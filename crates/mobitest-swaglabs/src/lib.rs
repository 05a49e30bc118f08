//! # mobitest-swaglabs
//!
//! End-to-end suite for the Swag Labs demo app (`com.swaglabsmobileapp`),
//! written against the `mobitest-core` engine.
//!
//! ## Modules
//!
//! - [`pages`] - Page objects: typed locator strategies plus page-level actions
//! - [`sim`] - [`SimulatedApp`](sim::SimulatedApp), an in-memory Swag Labs behind
//!   the [`DeviceSession`](mobitest_core::session::DeviceSession) trait
//! - [`scenarios`] - The suite's scenarios and their reports
//!
//! ## Example
//!
//! ```no_run
//! use mobitest_core::config::EngineConfig;
//! use mobitest_swaglabs::scenarios::{self, Scenario};
//! use mobitest_swaglabs::sim::SimOptions;
//!
//! # async fn demo() {
//! let report = scenarios::run(Scenario::CompleteOrder, &SimOptions::default(), &EngineConfig::load()).await;
//! println!("{}: {}", report.name, if report.passed { "PASS" } else { "FAIL" });
//! # }
//! ```

pub mod pages;
pub mod scenarios;
pub mod sim;
mod xpath;

/// Android package of the app under test.
pub const APP_PACKAGE: &str = "com.swaglabsmobileapp";

/// Credentials accepted by the app.
pub const STANDARD_USER: &str = "standard_user";
pub const LOCKED_OUT_USER: &str = "locked_out_user";
pub const PASSWORD: &str = "secret_sauce";
