//! The Swag Labs suite.
//!
//! Each scenario drives a freshly launched app through one user journey and
//! either returns a one-line detail of what it verified or fails. A failing
//! scenario captures a diagnostic snapshot before its report is built.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use mobitest_core::checkout::{CheckoutField, CheckoutOutcome};
use mobitest_core::config::EngineConfig;
use mobitest_core::error::EngineError;
use mobitest_core::interaction::Interactor;
use mobitest_core::session::DeviceSession;

use crate::pages::{CartPage, CheckoutPage, LoginPage, ProductsPage};
use crate::sim::{SimOptions, SimulatedApp};
use crate::{PASSWORD, STANDARD_USER};

/// Why a scenario failed.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Assertion failed: {0}")]
    Assertion(String),
}

fn ensure(condition: bool, message: impl Into<String>) -> Result<(), ScenarioError> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Assertion(message.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    SuccessfulLogin,
    InvalidLogin,
    MissingPassword,
    Logout,
    AddToCart,
    RemoveFromCart,
    CompleteOrder,
    CheckoutMissingInfo,
}

impl Scenario {
    pub const ALL: [Scenario; 8] = [
        Scenario::SuccessfulLogin,
        Scenario::InvalidLogin,
        Scenario::MissingPassword,
        Scenario::Logout,
        Scenario::AddToCart,
        Scenario::RemoveFromCart,
        Scenario::CompleteOrder,
        Scenario::CheckoutMissingInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::SuccessfulLogin => "successful_login",
            Scenario::InvalidLogin => "invalid_login",
            Scenario::MissingPassword => "missing_password",
            Scenario::Logout => "logout",
            Scenario::AddToCart => "add_to_cart",
            Scenario::RemoveFromCart => "remove_from_cart",
            Scenario::CompleteOrder => "complete_order",
            Scenario::CheckoutMissingInfo => "checkout_missing_info",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Scenario::SuccessfulLogin => "Standard user logs in and lands on PRODUCTS",
            Scenario::InvalidLogin => "Login without a username shows 'Username is required'",
            Scenario::MissingPassword => "Login without a password shows 'Password is required'",
            Scenario::Logout => "Logged-in user logs out through the menu",
            Scenario::AddToCart => "First product is added and shows up in the cart",
            Scenario::RemoveFromCart => "Product added to the cart can be removed again",
            Scenario::CompleteOrder => "Full checkout ends on the order confirmation",
            Scenario::CheckoutMissingInfo => "Blank checkout form is rejected and reports every field",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == wanted)
            .ok_or_else(|| format!("unknown scenario '{}'", s))
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub passed: bool,
    /// What was verified, or why it failed.
    pub detail: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Diagnostic snapshots captured during the run.
    pub snapshots: usize,
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

async fn login_as_standard_user(ui: &Interactor) -> Result<(), ScenarioError> {
    LoginPage::new(ui).login(STANDARD_USER, PASSWORD).await?;
    ensure(
        ProductsPage::new(ui).is_displayed().await,
        "products page not shown after login",
    )
}

async fn open_cart_with_one_product(ui: &Interactor) -> Result<(), ScenarioError> {
    login_as_standard_user(ui).await?;
    let products = ProductsPage::new(ui);
    products.add_first_product_to_cart().await?;
    products.go_to_cart().await?;
    Ok(())
}

async fn successful_login(ui: &Interactor) -> Result<String, ScenarioError> {
    LoginPage::new(ui).login(STANDARD_USER, PASSWORD).await?;
    let title = ProductsPage::new(ui).title().await?;
    ensure(
        title.as_deref() == Some("PRODUCTS"),
        format!("expected title PRODUCTS, found {:?}", title),
    )?;
    Ok("products page shown".to_string())
}

async fn login_error(ui: &Interactor, username: &str, password: &str, expected: &str) -> Result<String, ScenarioError> {
    let login = LoginPage::new(ui);
    login.login(username, password).await?;
    ensure(login.is_error_displayed().await, "login error not displayed")?;
    let message = login.error_message().await?.unwrap_or_default();
    ensure(
        message.contains(expected),
        format!("expected '{}', got '{}'", expected, message),
    )?;
    Ok(format!("error shown: {}", message))
}

async fn logout(ui: &Interactor) -> Result<String, ScenarioError> {
    login_as_standard_user(ui).await?;
    ProductsPage::new(ui).logout().await?;
    ensure(
        LoginPage::new(ui).is_displayed().await,
        "login page not shown after logout",
    )?;
    Ok("back on login page".to_string())
}

async fn add_to_cart(ui: &Interactor) -> Result<String, ScenarioError> {
    open_cart_with_one_product(ui).await?;
    let count = CartPage::new(ui).item_count().await?;
    ensure(count > 0, "cart is empty")?;
    Ok(format!("{} item(s) in cart", count))
}

async fn remove_from_cart(ui: &Interactor) -> Result<String, ScenarioError> {
    open_cart_with_one_product(ui).await?;
    let cart = CartPage::new(ui);
    cart.remove_first_product().await?;
    let count = cart.item_count().await?;
    ensure(count == 0, format!("{} item(s) left after remove", count))?;
    Ok("cart emptied".to_string())
}

async fn complete_order(ui: &Interactor) -> Result<String, ScenarioError> {
    open_cart_with_one_product(ui).await?;
    CartPage::new(ui).checkout().await?;

    let checkout = CheckoutPage::new(ui);
    let outcome = checkout.submit_info("Selman", "Karatas", "34000").await?;
    ensure(
        outcome == CheckoutOutcome::Advanced,
        format!("checkout did not advance: {:?}", outcome),
    )?;

    checkout.finish_order().await?;
    ensure(checkout.is_order_complete().await?, "order confirmation not shown")?;
    Ok("order confirmed".to_string())
}

async fn checkout_missing_info(ui: &Interactor) -> Result<String, ScenarioError> {
    open_cart_with_one_product(ui).await?;
    CartPage::new(ui).checkout().await?;

    let checkout = CheckoutPage::new(ui);
    let outcome = checkout.submit_info("", "", "").await?;
    let expected: BTreeSet<CheckoutField> = CheckoutField::ALL.into_iter().collect();
    match &outcome {
        CheckoutOutcome::ValidationError { fields_missing } if *fields_missing == expected => {}
        other => {
            return Err(ScenarioError::Assertion(format!(
                "expected every field reported missing, got {:?}",
                other
            )))
        }
    }
    ensure(checkout.is_error_displayed().await, "validation error not displayed")?;
    ensure(
        checkout.is_on_info_page().await,
        "left the information page despite the validation error",
    )?;
    Ok("validation error for firstName, lastName, zipCode".to_string())
}

async fn execute(scenario: Scenario, ui: &Interactor) -> Result<String, ScenarioError> {
    match scenario {
        Scenario::SuccessfulLogin => successful_login(ui).await,
        Scenario::InvalidLogin => login_error(ui, "", PASSWORD, "Username is required").await,
        Scenario::MissingPassword => login_error(ui, STANDARD_USER, "", "Password is required").await,
        Scenario::Logout => logout(ui).await,
        Scenario::AddToCart => add_to_cart(ui).await,
        Scenario::RemoveFromCart => remove_from_cart(ui).await,
        Scenario::CompleteOrder => complete_order(ui).await,
        Scenario::CheckoutMissingInfo => checkout_missing_info(ui).await,
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs `scenario` against an existing session.
pub async fn run_on(
    scenario: Scenario,
    session: Arc<dyn DeviceSession>,
    config: &EngineConfig,
) -> ScenarioReport {
    let span = info_span!("scenario", name = scenario.name());
    async {
        let ui = Interactor::new(session, config.clone());
        let started_at = Utc::now();
        let start = Instant::now();

        let result = execute(scenario, &ui).await;
        let (passed, detail) = match result {
            Ok(detail) => {
                info!(%detail, "scenario passed");
                (true, detail)
            }
            Err(e) => {
                warn!(error = %e, "scenario failed");
                ui.capture(&format!("scenario_failed_{}", scenario.name())).await;
                (false, e.to_string())
            }
        };

        ScenarioReport {
            name: scenario.name().to_string(),
            passed,
            detail,
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
            snapshots: ui.recorder().snapshots().len(),
        }
    }
    .instrument(span)
    .await
}

/// Launches a fresh simulated app and runs `scenario` on it.
pub async fn run(scenario: Scenario, options: &SimOptions, config: &EngineConfig) -> ScenarioReport {
    let app: Arc<dyn DeviceSession> = Arc::new(SimulatedApp::launch(options.clone()));
    run_on(scenario, app, config).await
}

/// Runs each scenario on its own freshly launched app, in order.
pub async fn run_all(
    scenarios: &[Scenario],
    options: &SimOptions,
    config: &EngineConfig,
) -> Vec<ScenarioReport> {
    let mut reports = Vec::with_capacity(scenarios.len());
    for &scenario in scenarios {
        reports.push(run(scenario, options, config).await);
    }
    reports
}
