//! Built-in diagnostic scenario sets.
//!
//! These encode the checks the one-off scripts kept re-implementing: role
//! login flows with demo credentials, landing-page navigation buttons, and
//! the same landing check across viewports. Every element is located
//! through a cascade because the front-end may render a control as a native
//! tag, an ARIA node, or a synthesized fallback form.

use clap::ValueEnum;
use sondar::{Condition, Scenario, Selector, SelectorList};

/// Application roles with their own login flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// Customer-facing login
    Customer,
    /// Staff portal login
    Staff,
    /// Admin system login
    Admin,
}

impl Role {
    /// Every role, in suite order
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Customer, Self::Staff, Self::Admin]
    }

    /// Lowercase role name used in routes and scenario names
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    /// Demo credentials for this role
    #[must_use]
    pub const fn credentials(self) -> (&'static str, &'static str) {
        match self {
            Self::Customer => ("customer@example.com", "customer123"),
            Self::Staff => ("staff@example.com", "staff123"),
            Self::Admin => ("admin@example.com", "admin123"),
        }
    }

    /// Landing-page button text for this role
    #[must_use]
    pub const fn button_text(self) -> &'static str {
        match self {
            Self::Customer => "Customer Login",
            Self::Staff => "Staff Access",
            Self::Admin => "Admin Portal",
        }
    }

    /// Login route for this role
    #[must_use]
    pub fn login_path(self) -> String {
        format!("/login/{}", self.name())
    }

    /// URL fragment expected after a successful login
    #[must_use]
    pub const fn landing_fragment(self) -> &'static str {
        match self {
            Self::Customer => "/home",
            Self::Staff => "/staff",
            Self::Admin => "/admin",
        }
    }
}

/// Viewports the responsive checks run under
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Viewport {
    /// 1280x720
    Desktop,
    /// 768x1024
    Tablet,
    /// 375x667
    Mobile,
}

impl Viewport {
    /// Every viewport, in suite order
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Desktop, Self::Tablet, Self::Mobile]
    }

    /// Lowercase viewport name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
        }
    }

    /// Width and height in CSS pixels
    #[must_use]
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Desktop => (1280, 720),
            Self::Tablet => (768, 1024),
            Self::Mobile => (375, 667),
        }
    }
}

/// Named scenario sets the CLI can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    /// Role login flows with demo credentials
    Login,
    /// Landing-page navigation buttons
    Navigation,
    /// Landing check across viewports
    Responsive,
    /// Everything
    All,
}

/// One scenario plus the viewport it should run under
#[derive(Debug, Clone)]
pub struct SuiteEntry {
    /// The scenario to run
    pub scenario: Scenario,
    /// Viewport override, if any
    pub viewport: Option<(u32, u32)>,
}

/// Email field strategies, most specific first
fn email_selectors() -> SelectorList {
    SelectorList::new(Selector::css("input[type='email']"))
        .or(Selector::css("input[placeholder*='email' i]"))
        .or(Selector::css("input[aria-label*='email' i]"))
        .or(Selector::test_id("email"))
        .or(Selector::css("input"))
}

/// Password field strategies
fn password_selectors() -> SelectorList {
    SelectorList::new(Selector::css("input[type='password']"))
        .or(Selector::css("input[placeholder*='password' i]"))
        .or(Selector::css("input[aria-label*='password' i]"))
        .or(Selector::test_id("password"))
}

/// Submit button strategies
fn submit_selectors() -> SelectorList {
    SelectorList::new(Selector::css("button[type='submit']"))
        .or(Selector::css_with_text("button", "Sign In"))
        .or(Selector::css_with_text("button", "Login"))
        .or(Selector::test_id("login_button"))
        .or(Selector::css("button"))
}

/// Landing button strategies for a role
fn nav_button_selectors(role: Role) -> SelectorList {
    SelectorList::new(Selector::text(role.button_text()))
        .or(Selector::css_with_text("button", role.button_text()))
        .or(Selector::role("button", role.button_text()))
}

/// Complete login flow for one role
#[must_use]
pub fn login_scenario(base: &str, role: Role) -> Scenario {
    let (email, password) = role.credentials();
    Scenario::new(format!("{}-login", role.name()))
        .navigate(format!("{base}{}", role.login_path()))
        .wait_for(Condition::body_text_at_least(40))
        .wait_for(Condition::element_visible(Selector::css("input")))
        .screenshot(format!("{}_login_form", role.name()))
        .locate(email_selectors())
        .fill(email)
        .locate(password_selectors())
        .fill(password)
        .locate(submit_selectors())
        .click()
        .wait_for_within(Condition::url_contains(role.landing_fragment()), 8_000)
        .expect(Condition::url_contains(role.landing_fragment()))
}

/// Landing-page button navigation for one role
#[must_use]
pub fn navigation_scenario(base: &str, role: Role) -> Scenario {
    Scenario::new(format!("navigation-{}", role.name()))
        .navigate(format!("{base}/"))
        .wait_for_within(Condition::body_text_at_least(10), 8_000)
        .locate(nav_button_selectors(role))
        .click()
        .assert_that(Condition::url_contains(role.login_path()))
        .screenshot(format!("{}_route", role.name()))
        .expect(Condition::url_contains(role.login_path()))
}

/// Landing render check under one viewport
#[must_use]
pub fn responsive_scenario(base: &str, viewport: Viewport) -> Scenario {
    Scenario::new(format!("responsive-{}", viewport.name()))
        .navigate(format!("{base}/"))
        .wait_for_within(Condition::body_text_at_least(10), 8_000)
        .screenshot(format!("landing_{}", viewport.name()))
        .expect(Condition::body_text_at_least(10))
}

/// Expand a suite id plus filters into concrete scenarios.
///
/// A role filter narrows the login/navigation sets; a viewport filter
/// narrows the responsive set and also pins the other sets to that
/// viewport.
#[must_use]
pub fn build_suite(
    suite: Suite,
    role_filter: Option<Role>,
    viewport_filter: Option<Viewport>,
    base: &str,
) -> Vec<SuiteEntry> {
    let roles: Vec<Role> = Role::all()
        .into_iter()
        .filter(|role| role_filter.map_or(true, |wanted| wanted == *role))
        .collect();
    let viewports: Vec<Viewport> = Viewport::all()
        .into_iter()
        .filter(|viewport| viewport_filter.map_or(true, |wanted| wanted == *viewport))
        .collect();
    let pinned = viewport_filter.map(Viewport::dimensions);

    let mut entries = Vec::new();
    if matches!(suite, Suite::Login | Suite::All) {
        entries.extend(roles.iter().map(|role| SuiteEntry {
            scenario: login_scenario(base, *role),
            viewport: pinned,
        }));
    }
    if matches!(suite, Suite::Navigation | Suite::All) {
        entries.extend(roles.iter().map(|role| SuiteEntry {
            scenario: navigation_scenario(base, *role),
            viewport: pinned,
        }));
    }
    if matches!(suite, Suite::Responsive | Suite::All) {
        entries.extend(viewports.iter().map(|viewport| SuiteEntry {
            scenario: responsive_scenario(base, *viewport),
            viewport: Some(viewport.dimensions()),
        }));
    }
    entries
}
