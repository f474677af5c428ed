//! In-memory driver for testing the harness without a browser.
//!
//! The mock models just enough of a page to exercise every harness path:
//! elements keyed by the selector that finds them, URL transitions wired to
//! clicks, injectable diagnostic events, scripted network activity, and
//! inputs that silently reject writes. Handles planted on elements go stale
//! on navigation, like the real thing.

use crate::driver::{Driver, ElementProbe};
use crate::recorder::DiagnosticEvent;
use crate::result::{SondarError, SondarResult};
use crate::selector::{BoundingBox, Selector};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// PNG magic prefix, enough for artifact plumbing tests
const PNG_STUB: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// One element the mock page knows about
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Tag name reported by probes
    pub tag_name: String,
    /// Text content reported by probes
    pub text: String,
    /// Current input value
    pub value: String,
    /// Whether the element is visible
    pub visible: bool,
    /// Whether the element is enabled
    pub enabled: bool,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            text: String::new(),
            value: String::new(),
            visible: true,
            enabled: true,
        }
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the current value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Make the element hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Make the element disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn probe(&self) -> ElementProbe {
        ElementProbe {
            tag_name: self.tag_name.clone(),
            text: self.text.clone(),
            visible: self.visible,
            enabled: self.enabled,
            bounding_box: self
                .visible
                .then(|| BoundingBox::new(0.0, 0.0, 120.0, 32.0)),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    elements: HashMap<String, MockElement>,
    markers: HashMap<String, String>,
    nav_on_click: HashMap<String, String>,
    reject_fill: HashSet<String>,
    body_text: String,
    pending_requests: usize,
    script_results: HashMap<String, serde_json::Value>,
    screenshot_data: Vec<u8>,
    fail_screenshot: bool,
    navigations: Vec<String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    hovers: Vec<String>,
    viewport: Option<(u32, u32)>,
}

/// Scriptable in-memory [`Driver`]
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
    events_tx: broadcast::Sender<DiagnosticEvent>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create an empty mock page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            state: Mutex::new(MockState {
                url: "about:blank".to_string(),
                screenshot_data: PNG_STUB.to_vec(),
                ..MockState::default()
            }),
            events_tx,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }

    /// Set the current URL directly
    pub fn set_url(&self, url: impl Into<String>) {
        self.lock().url = url.into();
    }

    /// Make `selector` resolve to `element`
    pub fn insert_element(&self, selector: &Selector, element: MockElement) {
        self.lock()
            .elements
            .insert(selector.to_string(), element);
    }

    /// Remove the element `selector` resolves to (simulates detachment)
    pub fn remove_element(&self, selector: &Selector) {
        let mut state = self.lock();
        let key = selector.to_string();
        state.elements.remove(&key);
        state.markers.retain(|_, target| target != &key);
    }

    /// Clicking the element `selector` resolves to navigates to `url`
    pub fn on_click_navigate(&self, selector: &Selector, url: impl Into<String>) {
        self.lock()
            .nav_on_click
            .insert(selector.to_string(), url.into());
    }

    /// The element `selector` resolves to silently drops written values
    pub fn reject_fill(&self, selector: &Selector) {
        self.lock().reject_fill.insert(selector.to_string());
    }

    /// Set the document body text
    pub fn set_body_text(&self, text: impl Into<String>) {
        self.lock().body_text = text.into();
    }

    /// Set the number of in-flight network requests
    pub fn set_pending_requests(&self, count: usize) {
        self.lock().pending_requests = count;
    }

    /// Script the result of an `evaluate` call
    pub fn set_script_result(&self, script: impl Into<String>, value: serde_json::Value) {
        self.lock().script_results.insert(script.into(), value);
    }

    /// Replace the screenshot payload
    pub fn set_screenshot_data(&self, data: Vec<u8>) {
        self.lock().screenshot_data = data;
    }

    /// Make screenshot capture fail
    pub fn fail_screenshots(&self) {
        self.lock().fail_screenshot = true;
    }

    /// Inject a diagnostic event into the session stream
    pub fn emit(&self, event: DiagnosticEvent) {
        // No receiver attached yet is fine
        let _ = self.events_tx.send(event);
    }

    /// URLs navigated to, in order
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Selector keys clicked, in order
    #[must_use]
    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    /// (selector key, value) pairs filled, in order
    #[must_use]
    pub fn fills(&self) -> Vec<(String, String)> {
        self.lock().fills.clone()
    }

    /// Selector keys hovered, in order
    #[must_use]
    pub fn hovers(&self) -> Vec<String> {
        self.lock().hovers.clone()
    }

    /// Last applied viewport, if any
    #[must_use]
    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.lock().viewport
    }

    fn resolve_marker(&self, marker: &str) -> SondarResult<String> {
        let state = self.lock();
        state
            .markers
            .get(marker)
            .cloned()
            .ok_or_else(|| SondarError::StaleHandle {
                selector: format!("marker:{marker}"),
            })
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> SondarResult<()> {
        let mut state = self.lock();
        state.url = url.to_string();
        state.navigations.push(url.to_string());
        // Navigation rebuilds the DOM: all handles go stale
        state.markers.clear();
        Ok(())
    }

    async fn current_url(&self) -> SondarResult<String> {
        Ok(self.lock().url.clone())
    }

    async fn evaluate(&self, script: &str) -> SondarResult<serde_json::Value> {
        Ok(self
            .lock()
            .script_results
            .get(script)
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn query(&self, selector: &Selector) -> SondarResult<Option<ElementProbe>> {
        Ok(self
            .lock()
            .elements
            .get(&selector.to_string())
            .map(MockElement::probe))
    }

    async fn tag(&self, selector: &Selector, marker: &str) -> SondarResult<bool> {
        let mut state = self.lock();
        let key = selector.to_string();
        if state.elements.contains_key(&key) {
            state.markers.insert(marker.to_string(), key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn probe_marker(&self, marker: &str) -> SondarResult<Option<ElementProbe>> {
        let state = self.lock();
        Ok(state
            .markers
            .get(marker)
            .and_then(|key| state.elements.get(key))
            .map(MockElement::probe))
    }

    async fn click_marker(&self, marker: &str) -> SondarResult<()> {
        let key = self.resolve_marker(marker)?;
        let mut state = self.lock();
        state.clicks.push(key.clone());
        if let Some(destination) = state.nav_on_click.get(&key).cloned() {
            state.url = destination;
            state.markers.clear();
        }
        Ok(())
    }

    async fn fill_marker(&self, marker: &str, value: &str) -> SondarResult<()> {
        let key = self.resolve_marker(marker)?;
        let mut state = self.lock();
        state.fills.push((key.clone(), value.to_string()));
        if !state.reject_fill.contains(&key) {
            if let Some(element) = state.elements.get_mut(&key) {
                element.value = value.to_string();
            }
        }
        Ok(())
    }

    async fn hover_marker(&self, marker: &str) -> SondarResult<()> {
        let key = self.resolve_marker(marker)?;
        self.lock().hovers.push(key);
        Ok(())
    }

    async fn read_value(&self, marker: &str) -> SondarResult<Option<String>> {
        let state = self.lock();
        Ok(state
            .markers
            .get(marker)
            .and_then(|key| state.elements.get(key))
            .map(|element| element.value.clone()))
    }

    async fn body_text(&self) -> SondarResult<String> {
        Ok(self.lock().body_text.clone())
    }

    async fn pending_requests(&self) -> SondarResult<usize> {
        Ok(self.lock().pending_requests)
    }

    async fn screenshot(&self) -> SondarResult<Vec<u8>> {
        let state = self.lock();
        if state.fail_screenshot {
            return Err(SondarError::Screenshot {
                message: "capture disabled for this mock".to_string(),
            });
        }
        Ok(state.screenshot_data.clone())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> SondarResult<()> {
        self.lock().viewport = Some((width, height));
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<DiagnosticEvent> {
        self.events_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_probes_element_state() {
        let driver = MockDriver::new();
        let selector = Selector::css("button");
        driver.insert_element(&selector, MockElement::new("button").with_text("Go"));

        let probe = driver.query(&selector).await.unwrap().unwrap();
        assert!(probe.is_interactable());
        assert_eq!(probe.tag_name, "button");
        assert_eq!(probe.text, "Go");
    }

    #[tokio::test]
    async fn test_hidden_element_probe() {
        let driver = MockDriver::new();
        let selector = Selector::css("button");
        driver.insert_element(&selector, MockElement::new("button").hidden());

        let probe = driver.query(&selector).await.unwrap().unwrap();
        assert!(!probe.visible);
        assert!(probe.bounding_box.is_none());
    }

    #[tokio::test]
    async fn test_markers_go_stale_on_navigation() {
        let driver = MockDriver::new();
        let selector = Selector::css("a");
        driver.insert_element(&selector, MockElement::new("a"));
        assert!(driver.tag(&selector, "m1").await.unwrap());
        assert!(driver.probe_marker("m1").await.unwrap().is_some());

        driver.navigate("http://localhost:8080/next").await.unwrap();
        assert!(driver.probe_marker("m1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_click_navigation_wiring() {
        let driver = MockDriver::new();
        let selector = Selector::text("Customer Login");
        driver.insert_element(&selector, MockElement::new("button"));
        driver.on_click_navigate(&selector, "http://localhost:8080/login/customer");
        driver.tag(&selector, "m1").await.unwrap();

        driver.click_marker("m1").await.unwrap();
        assert_eq!(
            driver.current_url().await.unwrap(),
            "http://localhost:8080/login/customer"
        );
        assert_eq!(driver.clicks(), vec![selector.to_string()]);
    }

    #[tokio::test]
    async fn test_reject_fill_keeps_old_value() {
        let driver = MockDriver::new();
        let selector = Selector::css("input");
        driver.insert_element(&selector, MockElement::new("input"));
        driver.reject_fill(&selector);
        driver.tag(&selector, "m1").await.unwrap();

        driver.fill_marker("m1", "hello").await.unwrap();
        assert_eq!(
            driver.read_value("m1").await.unwrap(),
            Some(String::new())
        );
    }

    #[tokio::test]
    async fn test_emitted_events_reach_subscribers() {
        let driver = MockDriver::new();
        let mut rx = driver.events();
        driver.emit(DiagnosticEvent::console("hello"));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.message, "hello");
    }
}
