//! Result and error types for Sondar.

use thiserror::Error;

/// Result type for Sondar operations
pub type SondarResult<T> = Result<T, SondarError>;

/// Errors that can occur in Sondar
#[derive(Debug, Error)]
pub enum SondarError {
    /// A wait/poll exceeded its budget
    #[error("Timed out after {elapsed_ms}ms (last predicate value: {last_value})")]
    Timeout {
        /// Wall-clock time spent waiting, in milliseconds
        elapsed_ms: u64,
        /// The predicate's most recent evaluation before the deadline
        last_value: bool,
    },

    /// A readiness predicate raised instead of returning a value
    #[error("Readiness predicate failed: {message}")]
    Predicate {
        /// Error message
        message: String,
    },

    /// No selector in a cascade matched a visible, interactable element
    #[error("No element found; tried selectors: {}", tried.join(", "))]
    NotFound {
        /// Every selector tried, in cascade order
        tried: Vec<String>,
    },

    /// Element detached between locate and act
    #[error("Element handle is stale: {selector}")]
    StaleHandle {
        /// Selector the handle was resolved from
        selector: String,
    },

    /// Element hidden or disabled at action time
    #[error("Element not interactable ({reason}): {selector}")]
    NotInteractable {
        /// Selector the handle was resolved from
        selector: String,
        /// Why the element cannot be interacted with
        reason: String,
    },

    /// Fill readback did not match the written value
    #[error("Value not applied: wrote {expected:?}, read back {actual:?}")]
    ValueNotApplied {
        /// Value that was written
        expected: String,
        /// Value read back from the element
        actual: String,
    },

    /// Underlying driver exception during an interaction
    #[error("{action} failed on {selector}: {message}")]
    Interaction {
        /// Action that was attempted (click, fill, hover)
        action: String,
        /// Selector the handle was resolved from
        selector: String,
        /// Error message from the driver
        message: String,
    },

    /// Scenario-level deadline exceeded
    #[error("Scenario '{scenario}' exceeded its {budget_ms}ms deadline")]
    ScenarioTimeout {
        /// Scenario name
        scenario: String,
        /// Deadline in milliseconds
        budget_ms: u64,
    },

    /// Report mutated after finalization (caller bug)
    #[error("Aggregate report already finalized; no further reports accepted")]
    Finalized,

    /// Browser could not be launched
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation failed
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Script evaluation failed
    #[error("Evaluation failed: {message}")]
    Evaluation {
        /// Error message
        message: String,
    },

    /// Screenshot capture failed
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SondarError {
    /// Whether this error is expected harness-level friction that a running
    /// scenario records as a failed step and moves past.
    ///
    /// Unexpected errors (browser crash, I/O, finalization misuse) escape
    /// the step loop and flip the scenario to `Errored`.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Predicate { .. }
                | Self::NotFound { .. }
                | Self::StaleHandle { .. }
                | Self::NotInteractable { .. }
                | Self::ValueNotApplied { .. }
                | Self::Interaction { .. }
                | Self::Navigation { .. }
                | Self::Evaluation { .. }
                | Self::Screenshot { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_carries_elapsed() {
        let err = SondarError::Timeout {
            elapsed_ms: 10_042,
            last_value: false,
        };
        assert!(err.to_string().contains("10042ms"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_not_found_lists_tried_selectors() {
        let err = SondarError::NotFound {
            tried: vec!["css:button".to_string(), "text:Sign In".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("css:button"));
        assert!(msg.contains("text:Sign In"));
    }

    #[test]
    fn test_finalized_is_not_recoverable() {
        assert!(!SondarError::Finalized.is_recoverable());
    }

    #[test]
    fn test_io_is_not_recoverable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SondarError = io.into();
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("I/O"));
    }

    #[test]
    fn test_value_not_applied_shows_both_sides() {
        let err = SondarError::ValueNotApplied {
            expected: "x".to_string(),
            actual: String::new(),
        };
        assert!(err.to_string().contains("\"x\""));
        assert!(err.is_recoverable());
    }
}
