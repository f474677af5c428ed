//! Scenario data model: a named, ordered sequence of automation steps.
//!
//! A scenario is immutable once built. What "success" means for it is an
//! explicit, scenario-level parameter (`expectations`) rather than something
//! the runner guesses from URL changes or page text.

use crate::poll::Condition;
use crate::selector::SelectorList;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default per-wait timeout inside a scenario (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// One automation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Navigate to a URL
    Navigate {
        /// Target URL
        url: String,
    },
    /// Wait for a readiness condition
    WaitFor {
        /// Condition to wait for
        condition: Condition,
        /// Wait budget in milliseconds
        timeout_ms: u64,
    },
    /// Resolve an element through a selector cascade
    Locate {
        /// Strategies to try, in priority order
        selectors: SelectorList,
    },
    /// Click the most recently located element
    Click,
    /// Fill the most recently located element
    Fill {
        /// Value to write
        value: String,
    },
    /// Hover over the most recently located element
    Hover,
    /// Check a condition once, recording pass/fail
    Assert {
        /// Condition to check
        condition: Condition,
    },
    /// Capture a labeled screenshot
    Screenshot {
        /// Label prefixed onto the artifact filename
        label: String,
    },
}

impl Action {
    /// Short description used in results and logs
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Navigate { url } => format!("navigate {url}"),
            Self::WaitFor {
                condition,
                timeout_ms,
            } => format!("wait for {} ({timeout_ms}ms)", condition.description()),
            Self::Locate { selectors } => format!(
                "locate [{}]",
                selectors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" | ")
            ),
            Self::Click => "click".to_string(),
            Self::Fill { value } => format!("fill {value:?}"),
            Self::Hover => "hover".to_string(),
            Self::Assert { condition } => format!("assert {}", condition.description()),
            Self::Screenshot { label } => format!("screenshot {label}"),
        }
    }
}

/// Outcome of executing one [`Action`].
///
/// Produced for every step, failed or not; recoverable errors land in
/// `error` instead of escaping the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Description of the action executed
    pub action: String,
    /// Whether the action succeeded
    pub succeeded: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Error message when the action failed
    pub error: Option<String>,
    /// Screenshot captured for this step, if any
    pub artifact: Option<PathBuf>,
}

impl ActionResult {
    /// Create a passing result
    #[must_use]
    pub fn ok(action: &Action, duration_ms: u64) -> Self {
        Self {
            action: action.describe(),
            succeeded: true,
            duration_ms,
            error: None,
            artifact: None,
        }
    }

    /// Create a failing result
    #[must_use]
    pub fn failed(action: &Action, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            action: action.describe(),
            succeeded: false,
            duration_ms,
            error: Some(error.into()),
            artifact: None,
        }
    }

    /// Attach a screenshot artifact
    #[must_use]
    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifact = Some(path);
        self
    }
}

/// A named user journey or diagnostic check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, used in reports and artifact labels
    pub name: String,
    /// Steps executed in order
    pub steps: Vec<Action>,
    /// Scenario-level success conditions, checked after all steps finish
    pub expectations: Vec<Condition>,
}

impl Scenario {
    /// Start building a scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            expectations: Vec::new(),
        }
    }

    /// Append an arbitrary step
    #[must_use]
    pub fn step(mut self, action: Action) -> Self {
        self.steps.push(action);
        self
    }

    /// Append a navigation step
    #[must_use]
    pub fn navigate(self, url: impl Into<String>) -> Self {
        self.step(Action::Navigate { url: url.into() })
    }

    /// Append a wait step with the default timeout
    #[must_use]
    pub fn wait_for(self, condition: Condition) -> Self {
        self.wait_for_within(condition, DEFAULT_WAIT_TIMEOUT_MS)
    }

    /// Append a wait step with an explicit timeout
    #[must_use]
    pub fn wait_for_within(self, condition: Condition, timeout_ms: u64) -> Self {
        self.step(Action::WaitFor {
            condition,
            timeout_ms,
        })
    }

    /// Append a locate step
    #[must_use]
    pub fn locate(self, selectors: impl Into<SelectorList>) -> Self {
        self.step(Action::Locate {
            selectors: selectors.into(),
        })
    }

    /// Append a click on the last located element
    #[must_use]
    pub fn click(self) -> Self {
        self.step(Action::Click)
    }

    /// Append a fill of the last located element
    #[must_use]
    pub fn fill(self, value: impl Into<String>) -> Self {
        self.step(Action::Fill {
            value: value.into(),
        })
    }

    /// Append a hover over the last located element
    #[must_use]
    pub fn hover(self) -> Self {
        self.step(Action::Hover)
    }

    /// Append a one-shot condition check
    #[must_use]
    pub fn assert_that(self, condition: Condition) -> Self {
        self.step(Action::Assert { condition })
    }

    /// Append a labeled screenshot
    #[must_use]
    pub fn screenshot(self, label: impl Into<String>) -> Self {
        self.step(Action::Screenshot {
            label: label.into(),
        })
    }

    /// Add a scenario-level success condition
    #[must_use]
    pub fn expect(mut self, condition: Condition) -> Self {
        self.expectations.push(condition);
        self
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the scenario has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
