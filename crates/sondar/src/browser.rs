//! Real browser control over the Chrome DevTools Protocol.
//!
//! Compiled only with the `browser` feature; everything here implements the
//! [`Driver`] trait via chromiumoxide. Without the feature, tests use
//! [`crate::mock::MockDriver`] instead.

#![allow(clippy::cast_possible_truncation)]

use crate::driver::{Driver, DriverConfig, ElementProbe, MARKER_ATTRIBUTE};
use crate::recorder::DiagnosticEvent;
use crate::result::{SondarError, SondarResult};
use crate::selector::{BoundingBox, Selector};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as OxideBrowser, BrowserConfig as OxideConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFailed, EventLoadingFinished,
    EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Requests finishing within this window still count against network idle
const NETWORK_IDLE_WINDOW_MS: u64 = 500;

/// Capacity of the diagnostic event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A launched browser that hands out one [`CdpDriver`] per context
#[derive(Debug)]
pub struct CdpBrowser {
    inner: Arc<tokio::sync::Mutex<OxideBrowser>>,
    #[allow(dead_code)]
    handle: tokio::task::JoinHandle<()>,
    config: DriverConfig,
}

impl CdpBrowser {
    /// Launch a browser process according to the config
    pub async fn launch(config: DriverConfig) -> SondarResult<Self> {
        let mut builder = OxideConfig::builder()
            .window_size(config.viewport_width, config.viewport_height);

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }

        let oxide_config = builder.build().map_err(|e| SondarError::BrowserLaunch {
            message: e.to_string(),
        })?;

        let (browser, mut handler) =
            OxideBrowser::launch(oxide_config)
                .await
                .map_err(|e| SondarError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        // Drive the CDP message loop until the connection drops
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            inner: Arc::new(tokio::sync::Mutex::new(browser)),
            handle,
            config,
        })
    }

    /// Open a fresh page and wire up its diagnostic listeners
    pub async fn new_driver(&self) -> SondarResult<CdpDriver> {
        let browser = self.inner.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SondarError::BrowserLaunch {
                message: e.to_string(),
            })?;
        drop(browser);
        CdpDriver::attach(page, &self.config).await
    }

    /// Close the browser process
    pub async fn close(self) -> SondarResult<()> {
        let mut browser = self.inner.lock().await;
        browser
            .close()
            .await
            .map_err(|e| SondarError::BrowserLaunch {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct NetworkWatch {
    in_flight: HashSet<String>,
    last_activity: Option<Instant>,
}

/// One browser page implementing [`Driver`] over CDP
#[derive(Debug)]
pub struct CdpDriver {
    page: Arc<Page>,
    events_tx: broadcast::Sender<DiagnosticEvent>,
    network: Arc<Mutex<NetworkWatch>>,
}

impl CdpDriver {
    async fn attach(page: Page, config: &DriverConfig) -> SondarResult<Self> {
        let page = Arc::new(page);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let network = Arc::new(Mutex::new(NetworkWatch::default()));

        page.execute(NetworkEnableParams::default())
            .await
            .map_err(|e| SondarError::BrowserLaunch {
                message: e.to_string(),
            })?;

        let driver = Self {
            page,
            events_tx,
            network,
        };
        driver.spawn_listeners().await?;
        driver
            .set_viewport(config.viewport_width, config.viewport_height)
            .await?;
        Ok(driver)
    }

    async fn spawn_listeners(&self) -> SondarResult<()> {
        let map_err = |e: chromiumoxide::error::CdpError| SondarError::BrowserLaunch {
            message: e.to_string(),
        };

        let mut console = self
            .page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(map_err)?;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = console.next().await {
                let _ = tx.send(DiagnosticEvent::console(format_console_event(&event)));
            }
        });

        let mut exceptions = self
            .page
            .event_listener::<EventExceptionThrown>()
            .await
            .map_err(map_err)?;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = exceptions.next().await {
                let _ = tx.send(DiagnosticEvent::page_error(format_exception_event(&event)));
            }
        });

        let mut sent = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(map_err)?;
        let network = self.network.clone();
        tokio::spawn(async move {
            while let Some(event) = sent.next().await {
                let mut watch = network.lock().expect("network watch lock");
                watch.in_flight.insert(format!("{:?}", event.request_id));
                watch.last_activity = Some(Instant::now());
            }
        });

        let mut finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(map_err)?;
        let network = self.network.clone();
        tokio::spawn(async move {
            while let Some(event) = finished.next().await {
                let mut watch = network.lock().expect("network watch lock");
                watch.in_flight.remove(&format!("{:?}", event.request_id));
                watch.last_activity = Some(Instant::now());
            }
        });

        let mut failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(map_err)?;
        let tx = self.events_tx.clone();
        let network = self.network.clone();
        tokio::spawn(async move {
            while let Some(event) = failed.next().await {
                {
                    let mut watch = network.lock().expect("network watch lock");
                    watch.in_flight.remove(&format!("{:?}", event.request_id));
                    watch.last_activity = Some(Instant::now());
                }
                let _ = tx.send(DiagnosticEvent::network_error(event.error_text.clone()));
            }
        });

        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(map_err)?;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let status = event.response.status as u16;
                if status >= 400 {
                    let _ = tx.send(DiagnosticEvent::http_status(
                        status,
                        event.response.url.clone(),
                    ));
                }
            }
        });

        Ok(())
    }

    async fn eval_value(&self, script: &str) -> SondarResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SondarError::Evaluation {
                message: e.to_string(),
            })?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn probe_expr(&self, expr: &str) -> SondarResult<Option<ElementProbe>> {
        let value = self.eval_value(&probe_script(expr)).await?;
        parse_probe(value)
    }

    /// Scroll the element into view and return the center of its box
    async fn center_of_marker(&self, marker: &str) -> SondarResult<(f64, f64)> {
        let expr = marker_expr(marker);
        self.eval_value(&format!(
            "(() => {{ const el = {expr}; if (el) el.scrollIntoView({{block: 'center'}}); return null; }})()"
        ))
        .await?;
        let probe = self
            .probe_expr(&expr)
            .await?
            .ok_or_else(|| SondarError::StaleHandle {
                selector: format!("marker:{marker}"),
            })?;
        let bbox = probe
            .bounding_box
            .unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0));
        Ok(bbox.center())
    }

    async fn dispatch_mouse(
        &self,
        kind: DispatchMouseEventType,
        x: f64,
        y: f64,
        with_button: bool,
    ) -> SondarResult<()> {
        let mut builder = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y);
        if with_button {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(|e| SondarError::Evaluation {
            message: e.to_string(),
        })?;
        self.page
            .execute(params)
            .await
            .map_err(|e| SondarError::Evaluation {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl Driver for CdpDriver {
    async fn navigate(&self, url: &str) -> SondarResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SondarError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        debug!(url, "navigated");
        Ok(())
    }

    async fn current_url(&self) -> SondarResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| SondarError::Evaluation {
                message: e.to_string(),
            })?;
        Ok(url.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> SondarResult<serde_json::Value> {
        self.eval_value(script).await
    }

    async fn query(&self, selector: &Selector) -> SondarResult<Option<ElementProbe>> {
        self.probe_expr(&selector.to_element_expr()).await
    }

    async fn tag(&self, selector: &Selector, marker: &str) -> SondarResult<bool> {
        let expr = selector.to_element_expr();
        let script = format!(
            "(() => {{ const el = {expr}; if (!el) return false; \
             el.setAttribute({MARKER_ATTRIBUTE:?}, {marker:?}); return true; }})()"
        );
        match self.eval_value(&script).await? {
            serde_json::Value::Bool(tagged) => Ok(tagged),
            other => Err(SondarError::Evaluation {
                message: format!("tag script returned non-boolean: {other}"),
            }),
        }
    }

    async fn probe_marker(&self, marker: &str) -> SondarResult<Option<ElementProbe>> {
        self.probe_expr(&marker_expr(marker)).await
    }

    async fn click_marker(&self, marker: &str) -> SondarResult<()> {
        let (x, y) = self.center_of_marker(marker).await?;
        self.dispatch_mouse(DispatchMouseEventType::MousePressed, x, y, true)
            .await?;
        self.dispatch_mouse(DispatchMouseEventType::MouseReleased, x, y, true)
            .await?;
        debug!(marker, x, y, "clicked");
        Ok(())
    }

    async fn fill_marker(&self, marker: &str, value: &str) -> SondarResult<()> {
        let expr = marker_expr(marker);
        // Value is set directly and the framework is notified through
        // synthetic input/change events; framework-rendered inputs often
        // ignore plain keystroke replay.
        let script = format!(
            "(() => {{ const el = {expr}; if (!el) return false; el.focus(); \
             el.value = {value:?}; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
             el.dispatchEvent(new Event('change', {{bubbles: true}})); \
             return true; }})()"
        );
        match self.eval_value(&script).await? {
            serde_json::Value::Bool(true) => Ok(()),
            serde_json::Value::Bool(false) => Err(SondarError::StaleHandle {
                selector: format!("marker:{marker}"),
            }),
            other => Err(SondarError::Evaluation {
                message: format!("fill script returned non-boolean: {other}"),
            }),
        }
    }

    async fn hover_marker(&self, marker: &str) -> SondarResult<()> {
        let (x, y) = self.center_of_marker(marker).await?;
        self.dispatch_mouse(DispatchMouseEventType::MouseMoved, x, y, false)
            .await
    }

    async fn read_value(&self, marker: &str) -> SondarResult<Option<String>> {
        let expr = marker_expr(marker);
        let script = format!(
            "(() => {{ const el = {expr}; if (!el) return null; \
             return ('value' in el) ? el.value : el.textContent; }})()"
        );
        match self.eval_value(&script).await? {
            serde_json::Value::String(value) => Ok(Some(value)),
            serde_json::Value::Null => Ok(None),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn body_text(&self) -> SondarResult<String> {
        let script = "document.body ? document.body.innerText : ''";
        match self.eval_value(script).await? {
            serde_json::Value::String(text) => Ok(text),
            _ => Ok(String::new()),
        }
    }

    async fn pending_requests(&self) -> SondarResult<usize> {
        let watch = self.network.lock().expect("network watch lock");
        let count = watch.in_flight.len();
        if count == 0 {
            // A request that just finished keeps the network "busy" until
            // the idle window passes
            let recently_active = watch.last_activity.is_some_and(|at| {
                at.elapsed() < Duration::from_millis(NETWORK_IDLE_WINDOW_MS)
            });
            return Ok(usize::from(recently_active));
        }
        Ok(count)
    }

    async fn screenshot(&self) -> SondarResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot =
            self.page
                .execute(params)
                .await
                .map_err(|e| SondarError::Screenshot {
                    message: e.to_string(),
                })?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| SondarError::Screenshot {
                message: e.to_string(),
            })
    }

    async fn set_viewport(&self, width: u32, height: u32) -> SondarResult<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(width))
            .height(i64::from(height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| SondarError::Evaluation { message: e })?;
        self.page
            .execute(params)
            .await
            .map_err(|e| SondarError::Evaluation {
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<DiagnosticEvent> {
        self.events_tx.subscribe()
    }
}

/// Element expression for a marker lookup
fn marker_expr(marker: &str) -> String {
    let query = format!("[{MARKER_ATTRIBUTE}={marker:?}]");
    format!("document.querySelector({query:?})")
}

/// Wrap an element expression into a probe returning state JSON or null.
///
/// Visibility mirrors what a user can see: a rendered box, not styled away,
/// with non-zero opacity.
fn probe_script(expr: &str) -> String {
    format!(
        "(() => {{ const el = {expr}; if (!el) return null; \
         const cs = window.getComputedStyle(el); \
         const box = el.getBoundingClientRect(); \
         const visible = box.width > 0 && box.height > 0 && \
           cs.display !== 'none' && cs.visibility !== 'hidden' && \
           parseFloat(cs.opacity) > 0; \
         const enabled = !el.disabled && el.getAttribute('aria-disabled') !== 'true'; \
         return {{ tag: el.tagName.toLowerCase(), \
           text: (el.textContent || '').trim().slice(0, 200), \
           visible, enabled, \
           x: box.x, y: box.y, width: box.width, height: box.height }}; }})()"
    )
}

#[derive(Debug, Deserialize)]
struct RawProbe {
    tag: String,
    text: String,
    visible: bool,
    enabled: bool,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

fn parse_probe(value: serde_json::Value) -> SondarResult<Option<ElementProbe>> {
    if value.is_null() {
        return Ok(None);
    }
    let raw: RawProbe = serde_json::from_value(value).map_err(|e| {
        warn!(%e, "malformed probe payload");
        SondarError::Evaluation {
            message: format!("malformed probe payload: {e}"),
        }
    })?;
    let bounding_box = BoundingBox::new(raw.x, raw.y, raw.width, raw.height);
    Ok(Some(ElementProbe {
        tag_name: raw.tag,
        text: raw.text,
        visible: raw.visible && bounding_box.has_area(),
        enabled: raw.enabled,
        bounding_box: bounding_box.has_area().then_some(bounding_box),
    }))
}

fn format_console_event(event: &EventConsoleApiCalled) -> String {
    let text = event
        .args
        .iter()
        .filter_map(|arg| {
            arg.value
                .as_ref()
                .map(ToString::to_string)
                .or_else(|| arg.description.clone())
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:?}: {text}", event.r#type)
}

fn format_exception_event(event: &EventExceptionThrown) -> String {
    let details = &event.exception_details;
    details
        .exception
        .as_ref()
        .and_then(|exception| exception.description.clone())
        .unwrap_or_else(|| details.text.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_script_checks_style_and_box() {
        let script = probe_script("document.querySelector(\"button\")");
        assert!(script.contains("getComputedStyle"));
        assert!(script.contains("getBoundingClientRect"));
        assert!(script.contains("opacity"));
        assert!(script.contains("aria-disabled"));
    }

    #[test]
    fn test_marker_expr_uses_attribute() {
        let expr = marker_expr("abc-123");
        assert!(expr.contains("data-sondar-id"));
        assert!(expr.contains("abc-123"));
    }

    #[test]
    fn test_parse_probe_null_is_none() {
        assert!(parse_probe(serde_json::Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_parse_probe_zero_box_is_not_visible() {
        let value = serde_json::json!({
            "tag": "div", "text": "", "visible": true, "enabled": true,
            "x": 0.0, "y": 0.0, "width": 0.0, "height": 0.0
        });
        let probe = parse_probe(value).unwrap().unwrap();
        assert!(!probe.visible);
        assert!(probe.bounding_box.is_none());
    }

    #[test]
    fn test_parse_probe_visible_element() {
        let value = serde_json::json!({
            "tag": "button", "text": "Sign In", "visible": true, "enabled": true,
            "x": 10.0, "y": 20.0, "width": 80.0, "height": 24.0
        });
        let probe = parse_probe(value).unwrap().unwrap();
        assert!(probe.is_interactable());
        assert_eq!(probe.bounding_box.unwrap().center(), (50.0, 32.0));
    }

    #[test]
    fn test_parse_probe_malformed_is_error() {
        let value = serde_json::json!({"tag": "div"});
        assert!(parse_probe(value).is_err());
    }
}
