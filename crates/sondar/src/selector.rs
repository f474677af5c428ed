//! Locator strategies for element discovery.
//!
//! UI frameworks can expose the same control through different DOM shapes
//! (native tag, ARIA role, synthesized accessibility node). A [`Selector`]
//! names one strategy for finding it; a [`SelectorList`] is the ordered set
//! of alternatives a cascade tries until one resolves.

use serde::{Deserialize, Serialize};

/// A strategy for locating a DOM element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., `button.primary`)
    Css {
        /// The CSS selector string
        css: String,
    },
    /// Element whose text content contains the given string
    Text {
        /// Text content to match
        text: String,
    },
    /// ARIA role plus accessible name
    Role {
        /// ARIA role (e.g., `button`)
        role: String,
        /// Accessible name (aria-label or text content)
        name: String,
    },
    /// XPath selector
    XPath {
        /// The XPath expression
        xpath: String,
    },
    /// Test ID selector (`data-testid` attribute)
    TestId {
        /// The test ID value
        id: String,
    },
    /// CSS selector filtered by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            css: selector.into(),
        }
    }

    /// Create a text content selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a role + accessible-name selector
    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::XPath {
            xpath: xpath.into(),
        }
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId { id: id.into() }
    }

    /// Create a CSS selector filtered by text content
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// JavaScript expression evaluating to the matched element or `null`.
    ///
    /// Text-based strategies pick the last match in document order, which is
    /// the deepest node containing the text rather than `<body>` itself.
    #[must_use]
    pub fn to_element_expr(&self) -> String {
        match self {
            Self::Css { css } => format!("document.querySelector({css:?})"),
            Self::Text { text } => format!(
                "(() => {{ const m = Array.from(document.querySelectorAll('*'))\
                 .filter(el => el.textContent.trim().includes({text:?})); \
                 return m.length ? m[m.length - 1] : null; }})()"
            ),
            Self::Role { role, name } => {
                let role_query = format!("[role={role}]");
                format!(
                    "Array.from(document.querySelectorAll({role_query:?}))\
                     .find(el => ((el.getAttribute('aria-label') || '') + el.textContent).includes({name:?})) || null"
                )
            }
            Self::XPath { xpath } => format!(
                "document.evaluate({xpath:?}, document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
            ),
            Self::TestId { id } => {
                let query = format!("[data-testid={id:?}]");
                format!("document.querySelector({query:?})")
            }
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({css:?}))\
                 .find(el => el.textContent.includes({text:?})) || null"
            ),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css { css } => write!(f, "css:{css}"),
            Self::Text { text } => write!(f, "text:{text}"),
            Self::Role { role, name } => write!(f, "role:{role}[{name}]"),
            Self::XPath { xpath } => write!(f, "xpath:{xpath}"),
            Self::TestId { id } => write!(f, "testid:{id}"),
            Self::CssWithText { css, text } => write!(f, "css:{css}[text={text}]"),
        }
    }
}

/// Axis-aligned bounding box of a rendered element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point as (x, y)
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the box has any rendered area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Non-empty ordered list of locator strategies, tried first to last.
///
/// Built from at least one selector, so the cascade invariant (never empty)
/// holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

impl SelectorList {
    /// Create a list with a single initial strategy
    #[must_use]
    pub fn new(first: Selector) -> Self {
        Self {
            selectors: vec![first],
        }
    }

    /// Append a fallback strategy
    #[must_use]
    pub fn or(mut self, fallback: Selector) -> Self {
        self.selectors.push(fallback);
        self
    }

    /// Selectors in priority order
    #[must_use]
    pub fn as_slice(&self) -> &[Selector] {
        &self.selectors
    }

    /// Number of strategies
    #[must_use]
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Always false: the list is non-empty by construction
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Iterate strategies in priority order
    pub fn iter(&self) -> std::slice::Iter<'_, Selector> {
        self.selectors.iter()
    }
}

impl From<Selector> for SelectorList {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}
