//! In-memory Swag Labs app behind the [`DeviceSession`] trait.
//!
//! [`SimulatedApp`] models the screens the suite walks through (login,
//! products, cart, checkout information, checkout overview, complete) as
//! flat element trees that are rebuilt from app state on every query. Locators
//! are evaluated the way a device would: accessibility ids against
//! `content-desc`, resource ids against `resource-id`, and XPath through a
//! small evaluator (see the crate's `xpath` module).
//!
//! Behaviour that the engine has to cope with on a real device is built in:
//!
//! - handles go stale whenever the app changes screen;
//! - the checkout overview renders after [`SimOptions::render_delay`];
//! - the overview's FINISH button is below the fold until one scroll;
//! - empty text fields report their hint text, as Android does;
//! - [`SimOptions::disconnect_after`] kills the session after N commands.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, trace};

use mobitest_core::element::{ElementHandle, GestureSpec, Viewport};
use mobitest_core::locator::Locator;
use mobitest_core::session::{DeviceSession, SessionError};

use crate::xpath::{self, Attr, XmlNode};
use crate::{LOCKED_OUT_USER, PASSWORD, STANDARD_USER};

pub const VIEWPORT: Viewport = Viewport {
    width: 1080,
    height: 2400,
};

const CATALOG: [(&str, &str); 4] = [
    ("Sauce Labs Backpack", "$29.99"),
    ("Sauce Labs Bike Light", "$9.99"),
    ("Sauce Labs Bolt T-Shirt", "$15.99"),
    ("Sauce Labs Fleece Jacket", "$49.99"),
];

/// Products visible without scrolling on the products screen.
const PRODUCTS_ABOVE_FOLD: usize = 2;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const VIEW_GROUP: &str = "android.view.ViewGroup";
const TEXT_VIEW: &str = "android.widget.TextView";
const EDIT_TEXT: &str = "android.widget.EditText";
const PROGRESS: &str = "android.widget.ProgressBar";

/// Knobs for a simulated run.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Time the checkout overview takes to render after continue is accepted.
    pub render_delay: Duration,
    /// Fail every command after this many with `Disconnected`.
    pub disconnect_after: Option<u32>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            render_delay: Duration::from_millis(800),
            disconnect_after: None,
        }
    }
}

/// Screens of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Products,
    Cart,
    CheckoutInfo,
    CheckoutOverview,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
    FirstName,
    LastName,
    ZipCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Focus(Field),
    Login,
    OpenMenu,
    Logout,
    AddToCart(usize),
    Remove(usize),
    OpenCart,
    Checkout,
    Continue,
    Finish,
    BackHome,
    Nothing,
}

#[derive(Debug, Clone)]
struct Node {
    key: String,
    parent: Option<String>,
    class: &'static str,
    content_desc: Option<String>,
    text: Option<String>,
    hint: Option<&'static str>,
    below_fold: bool,
    action: Action,
}

impl Node {
    fn new(key: impl Into<String>, class: &'static str) -> Self {
        Self {
            key: key.into(),
            parent: None,
            class,
            content_desc: None,
            text: None,
            hint: None,
            below_fold: false,
            action: Action::Nothing,
        }
    }

    fn desc(mut self, desc: impl Into<String>) -> Self {
        self.content_desc = Some(desc.into());
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn field(mut self, field: Field, value: &str, hint: &'static str) -> Self {
        self.text = (!value.is_empty()).then(|| value.to_string());
        self.hint = Some(hint);
        self.action = Action::Focus(field);
        self
    }

    fn child_of(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    fn on_click(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    fn below_fold_if(mut self, below: bool) -> Self {
        self.below_fold = below;
        self
    }

    fn editable(&self) -> Option<Field> {
        match self.action {
            Action::Focus(field) => Some(field),
            _ => None,
        }
    }
}

impl XmlNode for Node {
    fn attr(&self, attr: Attr) -> Option<&str> {
        match attr {
            Attr::Text => self.text.as_deref(),
            Attr::ContentDesc => self.content_desc.as_deref(),
            Attr::ResourceId => None,
            Attr::Class => Some(self.class),
        }
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn parent_key(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

#[derive(Debug)]
struct AppState {
    screen: Screen,
    /// Bumped on every screen change; handles from older generations are stale.
    generation: u64,
    ready_at: Instant,
    scrolled: bool,
    menu_open: bool,
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    zip_code: String,
    login_error: Option<&'static str>,
    checkout_error: Option<String>,
    cart: Vec<usize>,
    commands: u32,
    disconnected: bool,
}

impl AppState {
    fn new(now: Instant) -> Self {
        Self {
            screen: Screen::Login,
            generation: 0,
            ready_at: now,
            scrolled: false,
            menu_open: false,
            username: String::new(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            zip_code: String::new(),
            login_error: None,
            checkout_error: None,
            cart: Vec::new(),
            commands: 0,
            disconnected: false,
        }
    }

    fn navigate(&mut self, screen: Screen, ready_at: Instant) {
        debug!(from = ?self.screen, to = ?screen, "sim: navigate");
        self.screen = screen;
        self.generation += 1;
        self.ready_at = ready_at;
        self.scrolled = false;
        self.menu_open = false;
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::ZipCode => &mut self.zip_code,
        }
    }

    fn render(&self, now: Instant) -> Vec<Node> {
        if now < self.ready_at {
            return vec![Node::new("loading", PROGRESS).desc("loading")];
        }
        match self.screen {
            Screen::Login => self.render_login(),
            Screen::Products => self.render_products(),
            Screen::Cart => self.render_cart(),
            Screen::CheckoutInfo => self.render_checkout_info(),
            Screen::CheckoutOverview => self.render_overview(),
            Screen::Complete => vec![
                Node::new("complete", VIEW_GROUP).desc("test-CHECKOUT: COMPLETE!"),
                Node::new("complete-header", TEXT_VIEW)
                    .text("THANK YOU FOR YOU ORDER")
                    .child_of("complete"),
                Node::new("back-home", VIEW_GROUP)
                    .desc("test-BACK HOME")
                    .on_click(Action::BackHome),
            ],
        }
    }

    fn render_login(&self) -> Vec<Node> {
        let masked = "\u{2022}".repeat(self.password.chars().count());
        let mut nodes = vec![
            Node::new("username", EDIT_TEXT)
                .desc("test-Username")
                .field(Field::Username, &self.username, "Username"),
            Node::new("password", EDIT_TEXT)
                .desc("test-Password")
                .field(Field::Password, &masked, "Password"),
            Node::new("login", VIEW_GROUP).desc("test-LOGIN").on_click(Action::Login),
            Node::new("login-label", TEXT_VIEW).text("LOGIN").child_of("login"),
        ];
        if let Some(error) = self.login_error {
            nodes.push(Node::new("login-error", VIEW_GROUP).desc("test-Error message"));
            nodes.push(Node::new("login-error-text", TEXT_VIEW).text(error).child_of("login-error"));
        }
        nodes
    }

    fn render_products(&self) -> Vec<Node> {
        let mut nodes = vec![
            Node::new("title", TEXT_VIEW).text("PRODUCTS"),
            Node::new("menu", VIEW_GROUP).desc("test-Menu").on_click(Action::OpenMenu),
            Node::new("cart", VIEW_GROUP).desc("test-Cart").on_click(Action::OpenCart),
        ];
        if !self.cart.is_empty() {
            nodes.push(Node::new("cart-badge", TEXT_VIEW).text(self.cart.len().to_string()).child_of("cart"));
        }
        if self.menu_open {
            nodes.push(Node::new("logout", VIEW_GROUP).desc("test-LOGOUT").on_click(Action::Logout));
        }
        for (i, (name, price)) in CATALOG.iter().enumerate() {
            let below = i >= PRODUCTS_ABOVE_FOLD;
            let item = format!("item-{}", i);
            nodes.push(Node::new(item.clone(), VIEW_GROUP).desc("test-Item").below_fold_if(below));
            nodes.push(
                Node::new(format!("{}-title", item), TEXT_VIEW)
                    .desc("test-Item title")
                    .text(*name)
                    .child_of(&item)
                    .below_fold_if(below),
            );
            nodes.push(
                Node::new(format!("{}-price", item), TEXT_VIEW)
                    .desc("test-Price")
                    .text(*price)
                    .child_of(&item)
                    .below_fold_if(below),
            );
            let button = if self.cart.contains(&i) {
                Node::new(format!("{}-remove", item), VIEW_GROUP)
                    .desc("test-REMOVE")
                    .on_click(Action::Remove(i))
            } else {
                Node::new(format!("{}-add", item), VIEW_GROUP)
                    .desc("test-ADD TO CART")
                    .on_click(Action::AddToCart(i))
            };
            nodes.push(button.child_of(&item).below_fold_if(below));
        }
        nodes
    }

    fn cart_lines(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        for &i in &self.cart {
            let (name, _) = CATALOG[i];
            nodes.push(Node::new(format!("cart-item-{}", i), TEXT_VIEW).desc("test-Item").text(name));
        }
        nodes
    }

    fn render_cart(&self) -> Vec<Node> {
        let mut nodes = vec![Node::new("title", TEXT_VIEW).text("YOUR CART")];
        nodes.extend(self.cart_lines());
        for &i in &self.cart {
            nodes.push(
                Node::new(format!("cart-remove-{}", i), VIEW_GROUP)
                    .desc("test-REMOVE")
                    .on_click(Action::Remove(i)),
            );
        }
        nodes.push(Node::new("checkout", VIEW_GROUP).desc("test-CHECKOUT").on_click(Action::Checkout));
        nodes
    }

    fn render_checkout_info(&self) -> Vec<Node> {
        let mut nodes = vec![
            Node::new("title", TEXT_VIEW).text("CHECKOUT: INFORMATION"),
            Node::new("first-name", EDIT_TEXT)
                .desc("test-First Name")
                .field(Field::FirstName, &self.first_name, "First Name"),
            Node::new("last-name", EDIT_TEXT)
                .desc("test-Last Name")
                .field(Field::LastName, &self.last_name, "Last Name"),
            Node::new("zip-code", EDIT_TEXT)
                .desc("test-Zip/Postal Code")
                .field(Field::ZipCode, &self.zip_code, "Zip/Postal Code"),
        ];
        if let Some(error) = &self.checkout_error {
            nodes.push(Node::new("checkout-error", VIEW_GROUP).desc("test-Error message"));
            nodes.push(
                Node::new("checkout-error-text", TEXT_VIEW)
                    .text(error.clone())
                    .child_of("checkout-error"),
            );
        }
        nodes.push(Node::new("continue", VIEW_GROUP).desc("test-CONTINUE").on_click(Action::Continue));
        nodes.push(Node::new("continue-label", TEXT_VIEW).text("CONTINUE").child_of("continue"));
        nodes
    }

    fn render_overview(&self) -> Vec<Node> {
        let mut nodes = vec![Node::new("title", TEXT_VIEW).text("CHECKOUT: OVERVIEW")];
        nodes.extend(self.cart_lines());
        let total: f64 = self
            .cart
            .iter()
            .filter_map(|&i| CATALOG[i].1.trim_start_matches('$').parse::<f64>().ok())
            .sum();
        nodes.push(Node::new("total", TEXT_VIEW).text(format!("Item total: ${:.2}", total)));
        nodes.push(
            Node::new("finish", VIEW_GROUP)
                .desc("test-FINISH")
                .on_click(Action::Finish)
                .below_fold_if(true),
        );
        nodes.push(
            Node::new("finish-label", TEXT_VIEW)
                .text("FINISH")
                .child_of("finish")
                .below_fold_if(true),
        );
        nodes
    }

    fn apply(&mut self, action: Action, now: Instant, options: &SimOptions) {
        trace!(?action, "sim: click");
        match action {
            Action::Login => {
                self.login_error = if self.username.is_empty() {
                    Some("Username is required")
                } else if self.password.is_empty() {
                    Some("Password is required")
                } else if self.username == LOCKED_OUT_USER {
                    Some("Sorry, this user has been locked out.")
                } else if self.username != STANDARD_USER || self.password != PASSWORD {
                    Some("Username and password do not match any user in this service.")
                } else {
                    None
                };
                if self.login_error.is_none() {
                    self.navigate(Screen::Products, now);
                }
            }
            Action::OpenMenu => self.menu_open = true,
            Action::Logout => {
                self.username.clear();
                self.password.clear();
                self.cart.clear();
                self.navigate(Screen::Login, now);
            }
            Action::AddToCart(i) => {
                if !self.cart.contains(&i) {
                    self.cart.push(i);
                }
            }
            Action::Remove(i) => self.cart.retain(|&c| c != i),
            Action::OpenCart => self.navigate(Screen::Cart, now),
            Action::Checkout => {
                self.first_name.clear();
                self.last_name.clear();
                self.zip_code.clear();
                self.checkout_error = None;
                self.navigate(Screen::CheckoutInfo, now);
            }
            Action::Continue => {
                let missing = [
                    (&self.first_name, "First Name"),
                    (&self.last_name, "Last Name"),
                    (&self.zip_code, "Postal Code"),
                ]
                .into_iter()
                .find(|(value, _)| value.trim().is_empty())
                .map(|(_, label)| label);
                match missing {
                    Some(label) => self.checkout_error = Some(format!("Error: {} is required", label)),
                    None => self.navigate(Screen::CheckoutOverview, now + options.render_delay),
                }
            }
            Action::Finish => self.navigate(Screen::Complete, now),
            Action::BackHome => {
                self.cart.clear();
                self.navigate(Screen::Products, now);
            }
            Action::Focus(_) | Action::Nothing => {}
        }
    }
}

/// A simulated Swag Labs app session.
pub struct SimulatedApp {
    options: SimOptions,
    state: Mutex<AppState>,
}

impl SimulatedApp {
    /// A freshly launched app on the login screen.
    pub fn launch(options: SimOptions) -> Self {
        Self {
            options,
            state: Mutex::new(AppState::new(Instant::now())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, AppState>, SessionError> {
        self.state
            .lock()
            .map_err(|_| SessionError::CommandFailed("simulator state poisoned".to_string()))
    }

    /// Locks the state for one command, enforcing the disconnect budget.
    fn command(&self) -> Result<MutexGuard<'_, AppState>, SessionError> {
        let mut state = self.lock()?;
        if state.disconnected {
            return Err(SessionError::Disconnected);
        }
        state.commands += 1;
        if self.options.disconnect_after.is_some_and(|limit| state.commands > limit) {
            debug!(commands = state.commands, "sim: disconnecting");
            state.disconnected = true;
            return Err(SessionError::Disconnected);
        }
        Ok(state)
    }

    /// The screen the app is on.
    pub fn screen(&self) -> Option<Screen> {
        self.lock().ok().map(|s| s.screen)
    }

    /// Number of products in the cart.
    pub fn cart_len(&self) -> usize {
        self.lock().map(|s| s.cart.len()).unwrap_or_default()
    }

    /// Commands served so far.
    pub fn commands(&self) -> u32 {
        self.lock().map(|s| s.commands).unwrap_or_default()
    }

    fn query(state: &AppState, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let nodes = state.render(Instant::now());
        let handle = |n: &Node| ElementHandle::new(format!("{}:{}", state.generation, n.key));
        let found = match locator {
            Locator::AccessibilityId(id) => nodes
                .iter()
                .filter(|n| n.content_desc.as_deref() == Some(id.as_str()))
                .map(handle)
                .collect(),
            Locator::ElementId(id) => nodes
                .iter()
                .filter(|n| n.attr(Attr::ResourceId) == Some(id.as_str()))
                .map(handle)
                .collect(),
            Locator::XPath(expr) => {
                let xpath = xpath::parse(expr)
                    .map_err(|e| SessionError::CommandFailed(format!("invalid selector: {}", e)))?;
                xpath.select(&nodes).into_iter().map(handle).collect()
            }
        };
        Ok(found)
    }

    /// Finds the node a handle refers to in the current render.
    fn node(state: &AppState, handle: &ElementHandle) -> Result<Node, SessionError> {
        let stale = || SessionError::StaleElement(handle.id().to_string());
        let (generation, key) = handle.id().split_once(':').ok_or_else(stale)?;
        if generation != state.generation.to_string() {
            return Err(stale());
        }
        state
            .render(Instant::now())
            .into_iter()
            .find(|n| n.key == key)
            .ok_or_else(stale)
    }

    fn displayed(state: &AppState, node: &Node) -> bool {
        !node.below_fold || state.scrolled
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[async_trait]
impl DeviceSession for SimulatedApp {
    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>, SessionError> {
        let state = self.command()?;
        Ok(Self::query(&state, locator)?.into_iter().next())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let state = self.command()?;
        Self::query(&state, locator)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        let state = self.command()?;
        let node = Self::node(&state, element)?;
        Ok(Self::displayed(&state, &node))
    }

    async fn text(&self, element: &ElementHandle) -> Result<Option<String>, SessionError> {
        let state = self.command()?;
        let node = Self::node(&state, element)?;
        Ok(node.text.or_else(|| node.hint.map(str::to_string)))
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let mut state = self.command()?;
        let node = Self::node(&state, element)?;
        let field = node
            .editable()
            .ok_or_else(|| SessionError::NotInteractable(format!("{} is not editable", node.key)))?;
        state.field_mut(field).clear();
        Ok(())
    }

    async fn send_text(&self, element: &ElementHandle, text: &str) -> Result<(), SessionError> {
        let mut state = self.command()?;
        let node = Self::node(&state, element)?;
        let field = node
            .editable()
            .ok_or_else(|| SessionError::NotInteractable(format!("{} is not editable", node.key)))?;
        state.field_mut(field).push_str(text);
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let mut state = self.command()?;
        let node = Self::node(&state, element)?;
        if !Self::displayed(&state, &node) {
            return Err(SessionError::NotInteractable(format!("{} is off-screen", node.key)));
        }
        state.apply(node.action, Instant::now(), &self.options);
        Ok(())
    }

    async fn perform_gesture(&self, gesture: &GestureSpec) -> Result<(), SessionError> {
        let mut state = self.command()?;
        // Finger moving up reveals content below the fold.
        state.scrolled = gesture.dy() < 0;
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport, SessionError> {
        let _state = self.command()?;
        Ok(VIEWPORT)
    }

    async fn page_source(&self) -> Result<String, SessionError> {
        let state = self.command()?;
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<hierarchy>\n");
        for node in state.render(Instant::now()) {
            xml.push_str(&format!(
                "  <{} content-desc=\"{}\" text=\"{}\" displayed=\"{}\"/>\n",
                node.class,
                escape(node.content_desc.as_deref().unwrap_or("")),
                escape(node.text.as_deref().or(node.hint).unwrap_or("")),
                Self::displayed(&state, &node)
            ));
        }
        xml.push_str("</hierarchy>\n");
        Ok(xml)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let state = self.command()?;
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(format!("{:?}", state.screen).as_bytes());
        Ok(png)
    }
}
