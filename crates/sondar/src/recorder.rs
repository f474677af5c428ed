//! Diagnostic capture: console output, page errors, failed requests,
//! screenshots.
//!
//! The recorder never filters or classifies what it captures. Deciding
//! whether an event is an error or merely informational is the report
//! layer's concern; recording keeps the raw signal for post-hoc analysis.

use crate::driver::Driver;
use crate::result::SondarResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::debug;

/// Default directory for screenshot artifacts
pub const DEFAULT_SCREENSHOT_DIR: &str = "test-results";

/// Kind of diagnostic event emitted by a browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Console message (any level)
    Console,
    /// Uncaught page exception
    PageError,
    /// Request that failed to complete
    NetworkError,
    /// Response with a non-success HTTP status
    HttpStatus(u16),
}

/// A single captured diagnostic event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// What kind of event this is
    pub kind: EventKind,
    /// Raw message text as the browser reported it
    pub message: String,
    /// When the event arrived
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticEvent {
    /// Create a console event stamped now
    #[must_use]
    pub fn console(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Console,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a page-error event stamped now
    #[must_use]
    pub fn page_error(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::PageError,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a network-error event stamped now
    #[must_use]
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::NetworkError,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an HTTP status event stamped now
    #[must_use]
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::HttpStatus(status),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Directory screenshots are written into
    pub screenshot_dir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
        }
    }
}

impl RecorderConfig {
    /// Create a config writing screenshots under the given directory
    #[must_use]
    pub fn with_screenshot_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            screenshot_dir: dir.into(),
        }
    }
}

/// Deterministic screenshot filename: `{label}_{timestamp}.png`.
///
/// The timestamp is ISO 8601 at millisecond resolution with colons and the
/// fractional dot replaced by dashes, so names sort chronologically and are
/// valid on every filesystem. Two captures in the same run cannot collide
/// unless taken in the same millisecond with the same label.
#[must_use]
pub fn screenshot_filename(label: &str, at: DateTime<Utc>) -> String {
    format!("{label}_{}.png", at.format("%Y-%m-%dT%H-%M-%S-%3fZ"))
}

/// Captures diagnostic events and screenshots for one browser session.
///
/// Attach once per driver; the subscription lives until the recorder is
/// dropped with the session. Events buffer in arrival order and leave the
/// buffer exactly once via [`DiagnosticRecorder::drain`].
#[derive(Debug)]
pub struct DiagnosticRecorder {
    config: RecorderConfig,
    buffer: Vec<DiagnosticEvent>,
    rx: Option<broadcast::Receiver<DiagnosticEvent>>,
}

impl DiagnosticRecorder {
    /// Create a recorder with the given configuration
    #[must_use]
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            rx: None,
        }
    }

    /// Subscribe to a driver's console, page-error and failed-request
    /// notifications for the lifetime of this recorder.
    pub fn attach(&mut self, driver: &dyn Driver) {
        self.rx = Some(driver.events());
    }

    /// Subscribe to an already-obtained event stream
    pub fn attach_stream(&mut self, rx: broadcast::Receiver<DiagnosticEvent>) {
        self.rx = Some(rx);
    }

    /// Append an event to the buffer directly
    pub fn record(&mut self, event: DiagnosticEvent) {
        self.buffer.push(event);
    }

    /// Pull any pending events off the subscription into the buffer
    fn pump(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(event) => self.buffer.push(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    debug!(missed, "diagnostic event buffer lagged");
                }
                Err(_) => break,
            }
        }
    }

    /// Return all buffered events in arrival order and clear the buffer.
    ///
    /// At-most-once delivery: a drained event is gone from the recorder.
    #[must_use]
    pub fn drain(&mut self) -> Vec<DiagnosticEvent> {
        self.pump();
        std::mem::take(&mut self.buffer)
    }

    /// Number of events currently buffered (pumps the subscription first)
    pub fn pending(&mut self) -> usize {
        self.pump();
        self.buffer.len()
    }

    /// Capture a screenshot and persist it under the configured directory.
    ///
    /// Returns the path written. Filenames follow
    /// [`screenshot_filename`]; the directory is created on demand.
    pub async fn flush_screenshot(
        &self,
        driver: &dyn Driver,
        label: &str,
    ) -> SondarResult<PathBuf> {
        let data = driver.screenshot().await?;
        let path = self
            .config
            .screenshot_dir
            .join(screenshot_filename(label, Utc::now()));
        write_artifact(&path, &data).await?;
        debug!(path = %path.display(), bytes = data.len(), "screenshot written");
        Ok(path)
    }
}

async fn write_artifact(path: &Path, data: &[u8]) -> SondarResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    mod filename_tests {
        use super::*;

        #[test]
        fn test_filename_has_no_colons() {
            let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
            let name = screenshot_filename("login_form", at);
            assert!(!name.contains(':'));
            assert!(name.starts_with("login_form_2025-03-14T09-26-53"));
            assert!(name.ends_with(".png"));
        }

        #[test]
        fn test_same_label_different_times_distinct() {
            let a = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
            let b = a + chrono::Duration::milliseconds(1);
            assert_ne!(
                screenshot_filename("shot", a),
                screenshot_filename("shot", b)
            );
        }

        #[test]
        fn test_filenames_sort_chronologically() {
            let a = Utc.with_ymd_and_hms(2025, 3, 14, 9, 59, 59).unwrap();
            let b = Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap();
            assert!(screenshot_filename("s", a) < screenshot_filename("s", b));
        }
    }

    mod event_tests {
        use super::*;

        #[test]
        fn test_event_constructors() {
            assert_eq!(DiagnosticEvent::console("hi").kind, EventKind::Console);
            assert_eq!(
                DiagnosticEvent::page_error("boom").kind,
                EventKind::PageError
            );
            assert_eq!(
                DiagnosticEvent::network_error("net::ERR").kind,
                EventKind::NetworkError
            );
            assert_eq!(
                DiagnosticEvent::http_status(404, "/missing").kind,
                EventKind::HttpStatus(404)
            );
        }

        #[test]
        fn test_event_serde_round_trip() {
            let event = DiagnosticEvent::http_status(500, "boom");
            let json = serde_json::to_string(&event).unwrap();
            let back: DiagnosticEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(back.kind, EventKind::HttpStatus(500));
            assert_eq!(back.message, "boom");
        }
    }

    mod recorder_tests {
        use super::*;

        #[test]
        fn test_drain_clears_buffer() {
            let mut recorder = DiagnosticRecorder::new(RecorderConfig::default());
            recorder.record(DiagnosticEvent::console("one"));
            recorder.record(DiagnosticEvent::console("two"));
            let drained = recorder.drain();
            assert_eq!(drained.len(), 2);
            assert_eq!(drained[0].message, "one");
            assert!(recorder.drain().is_empty());
        }

        #[test]
        fn test_drain_pulls_subscribed_events_in_order() {
            let (tx, rx) = broadcast::channel(16);
            let mut recorder = DiagnosticRecorder::new(RecorderConfig::default());
            recorder.attach_stream(rx);
            tx.send(DiagnosticEvent::console("first")).unwrap();
            tx.send(DiagnosticEvent::page_error("second")).unwrap();
            let drained = recorder.drain();
            assert_eq!(drained.len(), 2);
            assert_eq!(drained[0].message, "first");
            assert_eq!(drained[1].message, "second");
        }

        #[test]
        fn test_recorder_keeps_everything_unfiltered() {
            let mut recorder = DiagnosticRecorder::new(RecorderConfig::default());
            recorder.record(DiagnosticEvent::console("info: fine"));
            recorder.record(DiagnosticEvent::console("error: bad"));
            assert_eq!(recorder.pending(), 2);
        }
    }
}
