//! Checkout submit classification over a scripted checkout information screen.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{interactor, FakeElement, FakeSession};

use mobitest_core::checkout::{CheckoutField, CheckoutFlow, CheckoutForm, CheckoutOutcome, CheckoutState};
use mobitest_core::error::EngineError;
use mobitest_core::locator::{Locator, LocatorStrategy};

const ERROR_XPATH: &str = "//android.widget.TextView[contains(@text, 'Error:')]";
const OVERVIEW_XPATH: &str = "//android.widget.TextView[@text='CHECKOUT: OVERVIEW']";

fn form() -> CheckoutForm {
    CheckoutForm {
        first_name: LocatorStrategy::single("first-name", Locator::accessibility_id("test-First Name")),
        last_name: LocatorStrategy::single("last-name", Locator::accessibility_id("test-Last Name")),
        zip_code: LocatorStrategy::single(
            "zip-code",
            Locator::accessibility_id("test-Zip/Postal Code"),
        ),
        continue_button: LocatorStrategy::single("continue", Locator::accessibility_id("test-CONTINUE")),
        error_indicator: LocatorStrategy::single("checkout-error", Locator::xpath(ERROR_XPATH))
            .or(Locator::xpath("//*[contains(@text, 'required')]")),
        next_step: LocatorStrategy::single("overview", Locator::xpath(OVERVIEW_XPATH)),
    }
}

/// The information screen. `error` and `overview` are absent until the
/// continue button reveals them.
fn screen(error: FakeElement, overview: FakeElement) -> Vec<FakeElement> {
    vec![
        FakeElement::new("first", Locator::accessibility_id("test-First Name")).placeholder("First Name"),
        FakeElement::new("last", Locator::accessibility_id("test-Last Name")).placeholder("Last Name"),
        FakeElement::new("zip", Locator::accessibility_id("test-Zip/Postal Code"))
            .placeholder("Zip/Postal Code"),
        FakeElement::new("continue", Locator::accessibility_id("test-CONTINUE")),
        error,
        overview,
    ]
}

fn error_banner() -> FakeElement {
    FakeElement::new("error", Locator::xpath(ERROR_XPATH))
        .text("Error: First Name is required")
        .absent()
}

fn overview_title() -> FakeElement {
    FakeElement::new("overview", Locator::xpath(OVERVIEW_XPATH))
        .text("CHECKOUT: OVERVIEW")
        .absent()
}

fn all_fields() -> BTreeSet<CheckoutField> {
    CheckoutField::ALL.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_all_blank_fields_are_reported_missing() {
    let session = Arc::new(
        FakeSession::new(screen(error_banner(), overview_title()))
            .reveal_on_click("continue", "error", 300),
    );
    let ui = interactor(&session);

    let outcome = ui.submit_checkout_form(&form(), "", "", "").await.unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::ValidationError {
            fields_missing: all_fields()
        }
    );
    assert_eq!(session.clicks(), vec!["continue".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_partially_filled_form_reports_only_blank_fields() {
    let session = Arc::new(
        FakeSession::new(screen(error_banner(), overview_title()))
            .reveal_on_click("continue", "error", 300),
    );
    let ui = interactor(&session);

    let outcome = ui
        .submit_checkout_form(&form(), "", "Doe", "   ")
        .await
        .unwrap();
    let expected: BTreeSet<_> = [CheckoutField::FirstName, CheckoutField::ZipCode]
        .into_iter()
        .collect();
    assert_eq!(
        outcome,
        CheckoutOutcome::ValidationError {
            fields_missing: expected
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_populated_form_advances() {
    let session = Arc::new(
        FakeSession::new(screen(error_banner(), overview_title()))
            .reveal_on_click("continue", "overview", 300),
    );
    let ui = interactor(&session);

    let outcome = ui
        .submit_checkout_form(&form(), "John", "Doe", "12345")
        .await
        .unwrap();
    assert_eq!(outcome, CheckoutOutcome::Advanced);
    assert_eq!(session.text_of("zip").as_deref(), Some("12345"));
    assert_eq!(session.scrolls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_render_times_out_with_one_scroll_and_snapshot() {
    let session = Arc::new(
        FakeSession::new(screen(error_banner(), overview_title()))
            .reveal_on_click("continue", "overview", 5_000),
    );
    let ui = interactor(&session);

    let outcome = ui
        .submit_checkout_form(&form(), "John", "Doe", "12345")
        .await
        .unwrap();
    assert_eq!(outcome, CheckoutOutcome::TimedOut);
    assert_eq!(session.scrolls(), 1);

    let snapshot = ui.recorder().last().expect("timeout snapshot");
    assert_eq!(snapshot.label, "checkout_timed_out");
}

#[tokio::test(start_paused = true)]
async fn test_next_step_below_fold_is_found_after_halfway_scroll() {
    let session = Arc::new(
        FakeSession::new(screen(error_banner(), overview_title().below_fold()))
            .reveal_on_click("continue", "overview", 100),
    );
    let ui = interactor(&session);

    let outcome = ui
        .submit_checkout_form(&form(), "John", "Doe", "12345")
        .await
        .unwrap();
    assert_eq!(outcome, CheckoutOutcome::Advanced);
    assert_eq!(session.scrolls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_wins_when_both_indicators_show() {
    let session = Arc::new(
        FakeSession::new(screen(error_banner(), overview_title()))
            .reveal_on_click("continue", "error", 300)
            .reveal_on_click("continue", "overview", 300),
    );
    let ui = interactor(&session);

    let outcome = ui
        .submit_checkout_form(&form(), "John", "Doe", "12345")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::ValidationError {
            fields_missing: BTreeSet::new()
        }
    );
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_flow_tracks_state_and_rejects_resubmit() {
    let session = Arc::new(
        FakeSession::new(screen(error_banner(), overview_title()))
            .reveal_on_click("continue", "overview", 100),
    );
    let ui = interactor(&session);
    let form = form();

    let mut flow = CheckoutFlow::new(&ui, &form);
    assert_eq!(flow.state(), CheckoutState::FormEntry);

    flow.fill(CheckoutField::FirstName, "John").await.unwrap();
    flow.fill(CheckoutField::LastName, "Doe").await.unwrap();
    flow.fill(CheckoutField::ZipCode, "12345").await.unwrap();

    assert_eq!(flow.submit().await.unwrap(), CheckoutOutcome::Advanced);
    assert_eq!(flow.state(), CheckoutState::Advanced);

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidState {
            expected: "FormEntry",
            actual: "Advanced"
        }
    ));

    let err = flow.fill(CheckoutField::FirstName, "Jane").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
    assert_eq!(session.clicks().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_continue_button_keeps_form_entry() {
    let mut elements = screen(error_banner(), overview_title());
    elements.retain(|e| e.id != "continue");
    let session = Arc::new(FakeSession::new(elements));
    let ui = interactor(&session);
    let form = form();

    let mut flow = CheckoutFlow::new(&ui, &form);
    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, EngineError::ElementNotFound { ref strategy } if strategy == "continue"));
    assert_eq!(flow.state(), CheckoutState::FormEntry);
}
