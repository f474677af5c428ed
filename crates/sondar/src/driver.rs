//! Abstract browser automation seam.
//!
//! The harness is a thin, structured layer over a driver that exposes
//! navigate/evaluate/locate/act/screenshot primitives. Keeping the seam
//! behind a trait lets the same scenarios run against a real CDP session
//! (the `browser` feature) or the in-memory [`crate::mock::MockDriver`].

use crate::recorder::DiagnosticEvent;
use crate::result::SondarResult;
use crate::selector::{BoundingBox, Selector};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Attribute planted on a resolved element so later interactions can find
/// it again and detect detachment.
pub const MARKER_ATTRIBUTE: &str = "data-sondar-id";

/// What a driver observed about an element at probe time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementProbe {
    /// Lowercased tag name
    pub tag_name: String,
    /// Trimmed text content
    pub text: String,
    /// Rendered and not hidden by style (non-zero box, `display` not
    /// `none`, `visibility` not `hidden`, opacity above zero)
    pub visible: bool,
    /// Not disabled (native or `aria-disabled`)
    pub enabled: bool,
    /// Bounding box if the element is rendered
    pub bounding_box: Option<BoundingBox>,
}

impl ElementProbe {
    /// Visible and enabled: safe to interact with
    #[must_use]
    pub const fn is_interactable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// A live reference to a located DOM element.
///
/// Valid until the DOM changes underneath it. The handle carries the marker
/// written into the element at resolution time; if a later probe by marker
/// finds nothing, the handle has gone stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Unique marker value stored in [`MARKER_ATTRIBUTE`]
    pub marker: String,
    /// The strategy that matched
    pub selector: Selector,
    /// Tag name observed at resolution time
    pub tag_name: String,
    /// Text content observed at resolution time
    pub text: String,
    /// Bounding box observed at resolution time
    pub bounding_box: Option<BoundingBox>,
}

impl ElementHandle {
    /// Describe the handle by its originating selector
    #[must_use]
    pub fn describe(&self) -> String {
        self.selector.to_string()
    }
}

/// Browser/driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to the browser binary (None = auto-detect)
    pub executable_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            executable_path: None,
            sandbox: true,
        }
    }
}

impl DriverConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set the browser executable path
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Disable the sandbox (containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Browser automation primitives the harness builds on.
///
/// One driver instance corresponds to one browser context and is exclusively
/// owned by one scenario run at a time. All methods are async suspension
/// points; element-level methods address the target by marker.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to a URL (GET)
    async fn navigate(&self, url: &str) -> SondarResult<()>;

    /// Current page URL
    async fn current_url(&self) -> SondarResult<String>;

    /// Evaluate a script, returning its JSON value
    async fn evaluate(&self, script: &str) -> SondarResult<serde_json::Value>;

    /// Probe for the element a selector resolves to, if any
    async fn query(&self, selector: &Selector) -> SondarResult<Option<ElementProbe>>;

    /// Plant `marker` on the element a selector resolves to.
    ///
    /// Returns false if the selector no longer matches anything.
    async fn tag(&self, selector: &Selector, marker: &str) -> SondarResult<bool>;

    /// Probe the element carrying `marker`, if still attached
    async fn probe_marker(&self, marker: &str) -> SondarResult<Option<ElementProbe>>;

    /// Click the element carrying `marker`
    async fn click_marker(&self, marker: &str) -> SondarResult<()>;

    /// Set the value of the element carrying `marker`
    async fn fill_marker(&self, marker: &str, value: &str) -> SondarResult<()>;

    /// Hover over the element carrying `marker`
    async fn hover_marker(&self, marker: &str) -> SondarResult<()>;

    /// Read back the current value of the element carrying `marker`.
    ///
    /// Returns None if the element is gone.
    async fn read_value(&self, marker: &str) -> SondarResult<Option<String>>;

    /// Full visible text of the document body
    async fn body_text(&self) -> SondarResult<String>;

    /// Number of network requests currently in flight (0 when idle)
    async fn pending_requests(&self) -> SondarResult<usize>;

    /// Capture a PNG screenshot of the page
    async fn screenshot(&self) -> SondarResult<Vec<u8>>;

    /// Resize the viewport
    async fn set_viewport(&self, width: u32, height: u32) -> SondarResult<()>;

    /// Subscribe to this session's diagnostic event stream
    fn events(&self) -> broadcast::Receiver<DiagnosticEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_config_builders() {
        let config = DriverConfig::new()
            .with_headless(false)
            .with_viewport(375, 667)
            .with_no_sandbox();
        assert!(!config.headless);
        assert_eq!(config.viewport_width, 375);
        assert_eq!(config.viewport_height, 667);
        assert!(!config.sandbox);
    }

    #[test]
    fn test_driver_config_defaults() {
        let config = DriverConfig::default();
        assert!(config.headless);
        assert_eq!(config.viewport_width, 1280);
        assert!(config.executable_path.is_none());
    }

    #[test]
    fn test_probe_interactable() {
        let probe = ElementProbe {
            tag_name: "button".to_string(),
            text: "Go".to_string(),
            visible: true,
            enabled: true,
            bounding_box: Some(BoundingBox::new(0.0, 0.0, 80.0, 24.0)),
        };
        assert!(probe.is_interactable());
    }

    #[test]
    fn test_probe_hidden_not_interactable() {
        let probe = ElementProbe {
            tag_name: "button".to_string(),
            text: String::new(),
            visible: false,
            enabled: true,
            bounding_box: None,
        };
        assert!(!probe.is_interactable());
    }

    #[test]
    fn test_handle_describe_uses_selector() {
        let handle = ElementHandle {
            marker: "abc".to_string(),
            selector: Selector::css("button.primary"),
            tag_name: "button".to_string(),
            text: "Go".to_string(),
            bounding_box: None,
        };
        assert_eq!(handle.describe(), "css:button.primary");
    }
}
