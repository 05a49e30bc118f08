//! Checkout information form: submit and classify the outcome.
//!
//! Submitting the form has exactly one of three outcomes: the app rejects
//! it with a validation error, advances to the next step, or shows neither
//! within the window. [`CheckoutFlow`] tracks this as a small state machine:
//!
//! ```text
//! FormEntry --submit--> Submitting --> ValidationError
//!                                  |-> Advanced
//!                                  `-> TimedOut
//! ```
//!
//! Both indicators are raced under one shared wait. Every poll looks for the
//! error indicator first, so when both are visible on the same poll the
//! outcome is `ValidationError`. If neither has shown up by half the window,
//! one recovery scroll is issued before polling continues.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::EngineError;
use crate::interaction::Interactor;
use crate::locator::LocatorStrategy;
use crate::resolver::ElementResolver;
use crate::scroll::Direction;
use crate::session::{DeviceSession, SessionError};
use crate::wait::{WaitEngine, WaitSpec, Waited};

/// A field of the checkout information form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutField {
    FirstName,
    LastName,
    ZipCode,
}

impl CheckoutField {
    pub const ALL: [CheckoutField; 3] = [
        CheckoutField::FirstName,
        CheckoutField::LastName,
        CheckoutField::ZipCode,
    ];

    /// Hint text the app shows while the field is empty.
    pub fn placeholder(self) -> &'static str {
        match self {
            CheckoutField::FirstName => "First Name",
            CheckoutField::LastName => "Last Name",
            CheckoutField::ZipCode => "Zip/Postal Code",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CheckoutField::FirstName => "firstName",
            CheckoutField::LastName => "lastName",
            CheckoutField::ZipCode => "zipCode",
        }
    }

    /// Whether `text`, as read back from the field, means "nothing entered".
    ///
    /// Some platforms report the placeholder as the text of an empty field.
    pub fn is_blank(self, text: Option<&str>) -> bool {
        match text.map(str::trim) {
            None => true,
            Some(t) => t.is_empty() || t.eq_ignore_ascii_case(self.placeholder()),
        }
    }
}

impl fmt::Display for CheckoutField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// The app showed its error indicator. `fields_missing` lists the fields
    /// that were blank when it did.
    ValidationError { fields_missing: BTreeSet<CheckoutField> },
    /// The next-step marker appeared.
    Advanced,
    /// Neither indicator appeared within the window.
    TimedOut,
}

impl CheckoutOutcome {
    pub fn is_advanced(&self) -> bool {
        matches!(self, CheckoutOutcome::Advanced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    FormEntry,
    Submitting,
    ValidationError,
    Advanced,
    TimedOut,
}

impl CheckoutState {
    pub fn name(self) -> &'static str {
        match self {
            CheckoutState::FormEntry => "FormEntry",
            CheckoutState::Submitting => "Submitting",
            CheckoutState::ValidationError => "ValidationError",
            CheckoutState::Advanced => "Advanced",
            CheckoutState::TimedOut => "TimedOut",
        }
    }
}

/// Locator strategies for the checkout information screen.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    pub first_name: LocatorStrategy,
    pub last_name: LocatorStrategy,
    pub zip_code: LocatorStrategy,
    pub continue_button: LocatorStrategy,
    /// Visible only when the app rejects the form.
    pub error_indicator: LocatorStrategy,
    /// Visible only once the app has moved past the form.
    pub next_step: LocatorStrategy,
}

impl CheckoutForm {
    pub fn field(&self, field: CheckoutField) -> &LocatorStrategy {
        match field {
            CheckoutField::FirstName => &self.first_name,
            CheckoutField::LastName => &self.last_name,
            CheckoutField::ZipCode => &self.zip_code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observed {
    Error,
    NextStep,
}

/// One pass over both indicators, error first.
async fn observe(
    resolver: &ElementResolver,
    session: &dyn DeviceSession,
    form: &CheckoutForm,
) -> Result<Option<Observed>, SessionError> {
    if resolver.probe(session, &form.error_indicator).await?.is_some() {
        return Ok(Some(Observed::Error));
    }
    if resolver.probe(session, &form.next_step).await?.is_some() {
        return Ok(Some(Observed::NextStep));
    }
    Ok(None)
}

/// Races the two indicators under `spec`, scrolling at most once.
async fn race(
    ui: &Interactor,
    form: &CheckoutForm,
    spec: &WaitSpec,
) -> Result<Waited<Observed>, SessionError> {
    let session = ui.session();
    let resolver = ui.resolver();
    let scrolled = AtomicBool::new(false);
    let scrolled = &scrolled;
    let halfway = spec.timeout() / 2;
    let start = Instant::now();

    WaitEngine::until(spec, move || async move {
        if let Some(seen) = observe(resolver, session, form).await? {
            return Ok(Some(seen));
        }
        if start.elapsed() >= halfway && !scrolled.swap(true, Ordering::SeqCst) {
            debug!("no checkout outcome at half the window, scrolling once");
            resolver.scroll().scroll_once(session, Direction::Down).await?;
            return observe(resolver, session, form).await;
        }
        Ok(None)
    })
    .await
}

/// Drives one checkout information form through a submit.
pub struct CheckoutFlow<'a> {
    ui: &'a Interactor,
    form: &'a CheckoutForm,
    state: CheckoutState,
}

impl<'a> CheckoutFlow<'a> {
    pub fn new(ui: &'a Interactor, form: &'a CheckoutForm) -> Self {
        Self {
            ui,
            form,
            state: CheckoutState::FormEntry,
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    fn expect_form_entry(&self) -> Result<(), EngineError> {
        if self.state != CheckoutState::FormEntry {
            return Err(EngineError::InvalidState {
                expected: CheckoutState::FormEntry.name(),
                actual: self.state.name(),
            });
        }
        Ok(())
    }

    /// Replaces the content of `field` with `text`.
    pub async fn fill(&mut self, field: CheckoutField, text: &str) -> Result<(), EngineError> {
        self.expect_form_entry()?;
        self.ui.type_text(self.form.field(field), text).await
    }

    /// Clicks continue and waits for the app's verdict.
    ///
    /// Continue is clicked even when fields are blank; detecting the
    /// rejection is the point. A click failure leaves the flow in
    /// `FormEntry`. A session fault during the race leaves it in
    /// `Submitting`, after which the flow cannot be reused.
    pub async fn submit(&mut self) -> Result<CheckoutOutcome, EngineError> {
        self.expect_form_entry()?;
        let spec = self.ui.config().checkout_wait()?;
        let span = info_span!("checkout_submit", timeout_ms = spec.timeout().as_millis() as u64);
        self.run_submit(&spec).instrument(span).await
    }

    async fn run_submit(&mut self, spec: &WaitSpec) -> Result<CheckoutOutcome, EngineError> {
        self.ui.click(&self.form.continue_button).await?;
        self.state = CheckoutState::Submitting;

        let outcome = match race(self.ui, self.form, spec).await? {
            Waited::Ready(Observed::Error) => {
                let fields_missing = self.missing_fields().await?;
                info!(missing = ?fields_missing, "checkout rejected");
                self.state = CheckoutState::ValidationError;
                CheckoutOutcome::ValidationError { fields_missing }
            }
            Waited::Ready(Observed::NextStep) => {
                info!("checkout advanced");
                self.state = CheckoutState::Advanced;
                CheckoutOutcome::Advanced
            }
            Waited::DeadlineExceeded { elapsed, attempts } => {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    attempts, "checkout outcome timed out"
                );
                self.ui.capture("checkout_timed_out").await;
                self.state = CheckoutState::TimedOut;
                CheckoutOutcome::TimedOut
            }
        };
        Ok(outcome)
    }

    async fn missing_fields(&self) -> Result<BTreeSet<CheckoutField>, EngineError> {
        let mut missing = BTreeSet::new();
        for field in CheckoutField::ALL {
            let text = self.ui.read_text_now(self.form.field(field)).await?;
            if field.is_blank(text.as_deref()) {
                missing.insert(field);
            }
        }
        Ok(missing)
    }
}

impl Interactor {
    /// Fills all three fields, then submits. Blank strings are typed as-is.
    pub async fn submit_checkout_form(
        &self,
        form: &CheckoutForm,
        first_name: &str,
        last_name: &str,
        zip_code: &str,
    ) -> Result<CheckoutOutcome, EngineError> {
        let mut flow = CheckoutFlow::new(self, form);
        flow.fill(CheckoutField::FirstName, first_name).await?;
        flow.fill(CheckoutField::LastName, last_name).await?;
        flow.fill(CheckoutField::ZipCode, zip_code).await?;
        flow.submit().await
    }
}
