//! Page objects for the Swag Labs app.
//!
//! Each page borrows the scenario's [`Interactor`] and exposes the actions
//! the suite needs. Locator strategies are plain functions so tests and the
//! simulator can share them; the order inside each strategy is the order in
//! which the engine tries them, most specific first.

use mobitest_core::checkout::{CheckoutForm, CheckoutOutcome};
use mobitest_core::error::EngineError;
use mobitest_core::interaction::Interactor;
use mobitest_core::locator::{Locator, LocatorStrategy};
use tracing::info;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

pub fn username_field() -> LocatorStrategy {
    LocatorStrategy::single("username", Locator::accessibility_id("test-Username"))
}

pub fn password_field() -> LocatorStrategy {
    LocatorStrategy::single("password", Locator::accessibility_id("test-Password"))
}

pub fn login_button() -> LocatorStrategy {
    LocatorStrategy::single("login", Locator::accessibility_id("test-LOGIN"))
}

pub fn login_error() -> LocatorStrategy {
    LocatorStrategy::single(
        "login-error",
        Locator::xpath("//android.view.ViewGroup[@content-desc='test-Error message']/android.widget.TextView"),
    )
    .or(Locator::accessibility_id("test-Error message"))
}

pub fn products_title() -> LocatorStrategy {
    LocatorStrategy::single(
        "products-title",
        Locator::xpath("//android.widget.TextView[@text='PRODUCTS']"),
    )
}

pub fn menu_button() -> LocatorStrategy {
    LocatorStrategy::single("menu", Locator::accessibility_id("test-Menu"))
}

pub fn logout_item() -> LocatorStrategy {
    LocatorStrategy::single("logout", Locator::accessibility_id("test-LOGOUT"))
}

pub fn add_to_cart_button() -> LocatorStrategy {
    LocatorStrategy::single("add-to-cart", Locator::accessibility_id("test-ADD TO CART"))
}

pub fn cart_icon() -> LocatorStrategy {
    LocatorStrategy::single("cart", Locator::accessibility_id("test-Cart"))
}

pub fn cart_items() -> LocatorStrategy {
    LocatorStrategy::single(
        "cart-items",
        Locator::xpath("//android.widget.TextView[contains(@content-desc, 'test-Item')]"),
    )
}

pub fn remove_button() -> LocatorStrategy {
    LocatorStrategy::single("remove", Locator::accessibility_id("test-REMOVE"))
}

pub fn checkout_button() -> LocatorStrategy {
    LocatorStrategy::single("checkout", Locator::accessibility_id("test-CHECKOUT"))
}

pub fn finish_button() -> LocatorStrategy {
    LocatorStrategy::single(
        "finish",
        Locator::xpath("//android.view.ViewGroup[@content-desc='test-FINISH']"),
    )
    .or(Locator::accessibility_id("test-FINISH"))
    .or(Locator::accessibility_id("test-Finish"))
    .or(Locator::xpath("//android.widget.TextView[contains(@text, 'FINISH')]"))
    .or(Locator::xpath("//android.widget.Button[contains(@text, 'FINISH')]"))
    .or(Locator::xpath("//*[contains(@content-desc, 'FINISH')]"))
    .or(Locator::xpath("//*[contains(@text, 'FINISH')]"))
    .or(Locator::xpath("//*[contains(@resource-id, 'finish')]"))
}

pub fn order_complete_marker() -> LocatorStrategy {
    LocatorStrategy::single("order-complete", Locator::accessibility_id("test-COMPLETE"))
        .or(Locator::xpath("//*[contains(@text, 'THANK YOU') or contains(@content-desc, 'COMPLETE')]"))
}

/// The checkout information form.
///
/// The error indicator leaves out the field-name searches (`First Name`
/// and friends) because those match the fields' own hint text.
pub fn checkout_form() -> CheckoutForm {
    CheckoutForm {
        first_name: LocatorStrategy::single("first-name", Locator::accessibility_id("test-First Name")),
        last_name: LocatorStrategy::single("last-name", Locator::accessibility_id("test-Last Name")),
        zip_code: LocatorStrategy::single(
            "zip-code",
            Locator::accessibility_id("test-Zip/Postal Code"),
        ),
        continue_button: LocatorStrategy::single("continue", Locator::accessibility_id("test-CONTINUE")),
        error_indicator: LocatorStrategy::single(
            "checkout-error",
            Locator::xpath("//android.widget.TextView[contains(@text, 'Error:')]"),
        )
        .or(Locator::xpath("//android.widget.TextView[contains(@text, 'required')]"))
        .or(Locator::xpath("//*[contains(@text, 'missing')]"))
        .or(Locator::xpath("//*[contains(@content-desc, 'error')]")),
        next_step: LocatorStrategy::single(
            "checkout-overview",
            Locator::xpath("//android.widget.TextView[@text='CHECKOUT: OVERVIEW']"),
        )
        .or(Locator::xpath("//android.view.ViewGroup[@content-desc='test-FINISH']")),
    }
}

/// Page-source phrases that mean the order went through.
const COMPLETION_PHRASES: [&str; 5] = [
    "THANK YOU FOR YOU ORDER",
    "ORDER CONFIRMATION",
    "THANK YOU",
    "ORDER PLACED",
    "COMPLETE",
];

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

pub struct LoginPage<'a> {
    ui: &'a Interactor,
}

impl<'a> LoginPage<'a> {
    pub fn new(ui: &'a Interactor) -> Self {
        Self { ui }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), EngineError> {
        info!(username, "logging in");
        self.ui.type_text(&username_field(), username).await?;
        self.ui.type_text(&password_field(), password).await?;
        self.ui.click(&login_button()).await
    }

    pub async fn error_message(&self) -> Result<Option<String>, EngineError> {
        self.ui.read_text(&login_error()).await
    }

    pub async fn is_error_displayed(&self) -> bool {
        self.ui.is_visible(&login_error()).await
    }

    pub async fn is_displayed(&self) -> bool {
        self.ui.is_visible(&login_button()).await && self.ui.is_visible(&username_field()).await
    }
}

pub struct ProductsPage<'a> {
    ui: &'a Interactor,
}

impl<'a> ProductsPage<'a> {
    pub fn new(ui: &'a Interactor) -> Self {
        Self { ui }
    }

    pub async fn title(&self) -> Result<Option<String>, EngineError> {
        self.ui.read_text(&products_title()).await
    }

    pub async fn is_displayed(&self) -> bool {
        self.ui.is_visible(&products_title()).await
    }

    pub async fn logout(&self) -> Result<(), EngineError> {
        self.ui.click(&menu_button()).await?;
        self.ui.click(&logout_item()).await
    }

    pub async fn add_first_product_to_cart(&self) -> Result<(), EngineError> {
        self.ui.click(&add_to_cart_button()).await
    }

    pub async fn go_to_cart(&self) -> Result<(), EngineError> {
        self.ui.click(&cart_icon()).await
    }
}

pub struct CartPage<'a> {
    ui: &'a Interactor,
}

impl<'a> CartPage<'a> {
    pub fn new(ui: &'a Interactor) -> Self {
        Self { ui }
    }

    pub async fn item_count(&self) -> Result<usize, EngineError> {
        self.ui.count(&cart_items()).await
    }

    pub async fn remove_first_product(&self) -> Result<(), EngineError> {
        self.ui.click(&remove_button()).await
    }

    pub async fn checkout(&self) -> Result<(), EngineError> {
        self.ui.click(&checkout_button()).await
    }
}

pub struct CheckoutPage<'a> {
    ui: &'a Interactor,
    form: CheckoutForm,
}

impl<'a> CheckoutPage<'a> {
    pub fn new(ui: &'a Interactor) -> Self {
        Self {
            ui,
            form: checkout_form(),
        }
    }

    pub fn form(&self) -> &CheckoutForm {
        &self.form
    }

    /// Fills the information form and submits it.
    pub async fn submit_info(
        &self,
        first_name: &str,
        last_name: &str,
        zip_code: &str,
    ) -> Result<CheckoutOutcome, EngineError> {
        self.ui
            .submit_checkout_form(&self.form, first_name, last_name, zip_code)
            .await
    }

    pub async fn is_on_info_page(&self) -> bool {
        self.ui.is_visible(&self.form.continue_button).await
            || self.ui.is_visible(&self.form.first_name).await
    }

    pub async fn is_error_displayed(&self) -> bool {
        self.ui.is_visible(&self.form.error_indicator).await
    }

    /// Clicks FINISH on the overview. It sits below the fold on small
    /// screens; the click's own recovery scroll brings it up.
    pub async fn finish_order(&self) -> Result<(), EngineError> {
        self.ui.click(&finish_button()).await
    }

    /// Looks for the confirmation marker, then falls back to searching the
    /// page source.
    pub async fn is_order_complete(&self) -> Result<bool, EngineError> {
        if self.ui.check_visible(&order_complete_marker()).await? {
            return Ok(true);
        }
        let found = self.ui.page_contains(&COMPLETION_PHRASES).await?;
        if let Some(phrase) = &found {
            info!(phrase = phrase.as_str(), "order completion found in page source");
        }
        Ok(found.is_some())
    }
}
