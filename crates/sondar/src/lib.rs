//! Sondar: resilient multi-strategy browser probing and interaction
//! harness.
//!
//! Sondar factors the pattern that ad-hoc diagnostic scripts keep
//! re-deriving (launch, navigate, poll for readiness, try selector after
//! selector, click, screenshot, eyeball the console) into one small library
//! with structured results.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      SONDAR Architecture                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌────────────────┐   ┌───────────────────────┐   │
//! │  │ Scenario │──►│ ScenarioRunner │──►│ Poller / Cascade /    │   │
//! │  │ (steps)  │   │  (state machine│   │ Interactor            │   │
//! │  └──────────┘   │   + deadline)  │   └──────────┬────────────┘   │
//! │                 └───────┬────────┘              │                │
//! │                         │              ┌────────▼────────┐       │
//! │  ┌────────────┐  report │              │ Driver (trait)  │       │
//! │  │ Aggregator │◄────────┘              │ CDP or mock     │       │
//! │  └────────────┘   DiagnosticRecorder ◄─┤ console/network │       │
//! │                   (events+screenshots) │ notifications   │       │
//! │                                        └─────────────────┘       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps inside one scenario run strictly in order; independent scenarios
//! may run on independent drivers. Recoverable failures (timeouts, missing
//! elements, stale handles) become data in the scenario report instead of
//! aborting the run.

#![warn(missing_docs)]

/// Selector cascade: ordered strategies, first visible match wins
pub mod cascade;
/// Abstract driver seam over the browser automation engine
pub mod driver;
/// Click/fill/hover with pre- and post-condition checks
pub mod interact;
/// In-memory scriptable driver for tests
pub mod mock;
/// Readiness polling and page conditions
pub mod poll;
/// Diagnostic event capture and screenshot artifacts
pub mod recorder;
/// Scenario reports and run aggregation
pub mod report;
mod result;
/// Scenario execution state machine
pub mod runner;
/// Scenario data model
pub mod scenario;
/// Locator strategies
pub mod selector;

/// Real CDP driver (chromiumoxide), enabled with the `browser` feature
#[cfg(feature = "browser")]
pub mod browser;

pub use cascade::{
    CascadeOptions, SelectorCascade, DEFAULT_CASCADE_BUDGET_MS, DEFAULT_SWEEP_INTERVAL_MS,
};
pub use driver::{Driver, DriverConfig, ElementHandle, ElementProbe, MARKER_ATTRIBUTE};
pub use interact::{ClickOutcome, InteractOptions, Interactor, DEFAULT_SETTLE_MS};
pub use mock::{MockDriver, MockElement};
pub use poll::{
    Condition, PollOptions, PollOutcome, Poller, UrlPattern, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POLL_TIMEOUT_MS,
};
pub use recorder::{
    screenshot_filename, DiagnosticEvent, DiagnosticRecorder, EventKind, RecorderConfig,
    DEFAULT_SCREENSHOT_DIR,
};
pub use report::{AggregateReport, Aggregator, ScenarioReport, Summary};
pub use result::{SondarError, SondarResult};
pub use runner::{
    FailurePolicy, RunnerOptions, ScenarioRunner, ScenarioStatus, DEFAULT_SCENARIO_TIMEOUT_MS,
};
pub use scenario::{Action, ActionResult, Scenario, DEFAULT_WAIT_TIMEOUT_MS};
pub use selector::{BoundingBox, Selector, SelectorList};

#[cfg(feature = "browser")]
pub use browser::{CdpBrowser, CdpDriver};
