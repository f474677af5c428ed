//! Readiness polling.
//!
//! Every wait in the harness goes through [`Poller::wait_until`]: evaluate a
//! predicate, return on the first true, sleep the interval, re-check the
//! deadline. A false predicate is never an error; only the deadline or an
//! exception inside the predicate fails the wait.

use crate::driver::Driver;
use crate::result::{SondarError, SondarResult};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Pattern for matching page URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p}"),
            Self::Prefix(p) => write!(f, "url starts with {p}"),
            Self::Contains(p) => write!(f, "url contains {p}"),
            Self::Regex(p) => write!(f, "url matches /{p}/"),
        }
    }
}

/// A readiness condition evaluated against the live page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// An element resolved by the selector is visible
    ElementVisible {
        /// Selector to probe
        selector: Selector,
    },
    /// The document body contains the given text
    TextVisible {
        /// Text to look for
        text: String,
    },
    /// The document body holds at least this many characters.
    ///
    /// Canvas-rendered front-ends paint real text late; a length threshold
    /// is the cheapest "has the app actually rendered" probe.
    BodyTextAtLeast {
        /// Minimum number of characters
        chars: usize,
    },
    /// The current URL matches a pattern
    UrlMatches {
        /// Pattern to match against
        pattern: UrlPattern,
    },
    /// No network requests in flight
    NetworkIdle,
    /// A script expression evaluates to true
    Script {
        /// JavaScript expression returning a boolean
        expression: String,
    },
}

impl Condition {
    /// Condition: element resolved by `selector` is visible
    #[must_use]
    pub fn element_visible(selector: Selector) -> Self {
        Self::ElementVisible { selector }
    }

    /// Condition: body text contains `text`
    #[must_use]
    pub fn text_visible(text: impl Into<String>) -> Self {
        Self::TextVisible { text: text.into() }
    }

    /// Condition: body text is at least `chars` characters long
    #[must_use]
    pub const fn body_text_at_least(chars: usize) -> Self {
        Self::BodyTextAtLeast { chars }
    }

    /// Condition: current URL contains `fragment`
    #[must_use]
    pub fn url_contains(fragment: impl Into<String>) -> Self {
        Self::UrlMatches {
            pattern: UrlPattern::Contains(fragment.into()),
        }
    }

    /// Condition: current URL matches `pattern`
    #[must_use]
    pub fn url_matches(pattern: UrlPattern) -> Self {
        Self::UrlMatches { pattern }
    }

    /// Condition: network is idle
    #[must_use]
    pub const fn network_idle() -> Self {
        Self::NetworkIdle
    }

    /// Condition: script expression evaluates to true
    #[must_use]
    pub fn script(expression: impl Into<String>) -> Self {
        Self::Script {
            expression: expression.into(),
        }
    }

    /// Evaluate the condition once against the driver
    pub async fn evaluate(&self, driver: &dyn Driver) -> SondarResult<bool> {
        match self {
            Self::ElementVisible { selector } => Ok(driver
                .query(selector)
                .await?
                .is_some_and(|probe| probe.visible)),
            Self::TextVisible { text } => Ok(driver.body_text().await?.contains(text)),
            Self::BodyTextAtLeast { chars } => {
                Ok(driver.body_text().await?.chars().count() >= *chars)
            }
            Self::UrlMatches { pattern } => Ok(pattern.matches(&driver.current_url().await?)),
            Self::NetworkIdle => Ok(driver.pending_requests().await? == 0),
            Self::Script { expression } => match driver.evaluate(expression).await? {
                serde_json::Value::Bool(value) => Ok(value),
                other => Err(SondarError::Predicate {
                    message: format!("script condition returned non-boolean: {other}"),
                }),
            },
        }
    }

    /// Human-readable description for logs and error messages
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::ElementVisible { selector } => format!("element visible: {selector}"),
            Self::TextVisible { text } => format!("text visible: {text:?}"),
            Self::BodyTextAtLeast { chars } => format!("body text >= {chars} chars"),
            Self::UrlMatches { pattern } => pattern.to_string(),
            Self::NetworkIdle => "network idle".to_string(),
            Self::Script { expression } => format!("script: {expression}"),
        }
    }
}

/// Options for wait operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub interval_ms: u64,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PollOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval in milliseconds
    #[must_use]
    pub const fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }
}

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Polls predicates until they hold or a deadline passes
#[derive(Debug, Clone, Copy, Default)]
pub struct Poller;

impl Poller {
    /// Create a poller
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Poll `predicate` at the configured cadence until it returns true or
    /// the timeout elapses.
    ///
    /// Returns immediately on the first true evaluation. The predicate is
    /// always evaluated at least once, even with a zero timeout. An error
    /// inside the predicate surfaces as [`SondarError::Predicate`].
    pub async fn wait_until<F, Fut>(
        &self,
        mut predicate: F,
        options: &PollOptions,
    ) -> SondarResult<PollOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SondarResult<bool>>,
    {
        let start = Instant::now();
        let timeout = Duration::from_millis(options.timeout_ms);
        let interval = Duration::from_millis(options.interval_ms);

        loop {
            let value = match predicate().await {
                Ok(value) => value,
                Err(err @ SondarError::Predicate { .. }) => return Err(err),
                Err(err) => {
                    return Err(SondarError::Predicate {
                        message: err.to_string(),
                    })
                }
            };
            if value {
                return Ok(PollOutcome {
                    elapsed: start.elapsed(),
                    waited_for: "predicate".to_string(),
                });
            }
            if start.elapsed() >= timeout {
                return Err(SondarError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    last_value: value,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Wait for a page condition to hold
    pub async fn wait_for(
        &self,
        driver: &dyn Driver,
        condition: &Condition,
        options: &PollOptions,
    ) -> SondarResult<PollOutcome> {
        let outcome = self
            .wait_until(|| condition.evaluate(driver), options)
            .await?;
        debug!(
            condition = %condition.description(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "condition satisfied"
        );
        Ok(PollOutcome {
            waited_for: condition.description(),
            ..outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_exact_match() {
            let pattern = UrlPattern::Exact("http://localhost:8080/home".to_string());
            assert!(pattern.matches("http://localhost:8080/home"));
            assert!(!pattern.matches("http://localhost:8080/home/"));
        }

        #[test]
        fn test_prefix_match() {
            let pattern = UrlPattern::Prefix("http://localhost".to_string());
            assert!(pattern.matches("http://localhost:8080/login"));
            assert!(!pattern.matches("https://localhost:8080"));
        }

        #[test]
        fn test_contains_match() {
            let pattern = UrlPattern::Contains("/login/customer".to_string());
            assert!(pattern.matches("http://localhost:8080/login/customer"));
            assert!(!pattern.matches("http://localhost:8080/login/admin"));
        }

        #[test]
        fn test_regex_match() {
            let pattern = UrlPattern::Regex(r"/login/(customer|staff)$".to_string());
            assert!(pattern.matches("http://localhost:8080/login/staff"));
            assert!(!pattern.matches("http://localhost:8080/login/admin"));
        }

        #[test]
        fn test_invalid_regex_never_matches() {
            let pattern = UrlPattern::Regex("(".to_string());
            assert!(!pattern.matches("anything"));
        }
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn test_url_contains_sugar() {
            let condition = Condition::url_contains("/home");
            assert_eq!(
                condition,
                Condition::UrlMatches {
                    pattern: UrlPattern::Contains("/home".to_string())
                }
            );
        }

        #[test]
        fn test_descriptions_name_the_target() {
            assert!(Condition::text_visible("Welcome Back")
                .description()
                .contains("Welcome Back"));
            assert!(Condition::body_text_at_least(50)
                .description()
                .contains("50"));
            assert_eq!(Condition::network_idle().description(), "network idle");
        }

        #[test]
        fn test_condition_serde_round_trip() {
            let condition = Condition::element_visible(Selector::css("input[type='email']"));
            let json = serde_json::to_string(&condition).unwrap();
            assert!(json.contains("element_visible"));
            let back: Condition = serde_json::from_str(&json).unwrap();
            assert_eq!(back, condition);
        }
    }

    mod poller_tests {
        use super::*;

        #[tokio::test]
        async fn test_immediate_true_returns_at_once() {
            let poller = Poller::new();
            let options = PollOptions::new().with_timeout(10_000).with_interval(500);
            let start = Instant::now();
            let outcome = poller.wait_until(|| async { Ok(true) }, &options).await;
            assert!(outcome.is_ok());
            // No interval sleep on first success
            assert!(start.elapsed() < Duration::from_millis(400));
        }

        #[tokio::test]
        async fn test_false_predicate_times_out_not_errors() {
            let poller = Poller::new();
            let options = PollOptions::new().with_timeout(50).with_interval(10);
            let result = poller.wait_until(|| async { Ok(false) }, &options).await;
            match result {
                Err(SondarError::Timeout { last_value, .. }) => assert!(!last_value),
                other => panic!("expected Timeout, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_predicate_error_is_surfaced() {
            let poller = Poller::new();
            let options = PollOptions::new().with_timeout(200).with_interval(10);
            let result = poller
                .wait_until(
                    || async {
                        Err(SondarError::Evaluation {
                            message: "page crashed".to_string(),
                        })
                    },
                    &options,
                )
                .await;
            match result {
                Err(SondarError::Predicate { message }) => {
                    assert!(message.contains("page crashed"));
                }
                other => panic!("expected Predicate, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_becomes_true_after_a_few_polls() {
            let poller = Poller::new();
            let options = PollOptions::new().with_timeout(2_000).with_interval(10);
            let calls = AtomicUsize::new(0);
            let outcome = poller
                .wait_until(
                    || {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        async move { Ok(n >= 3) }
                    },
                    &options,
                )
                .await;
            assert!(outcome.is_ok());
            assert!(calls.load(Ordering::SeqCst) >= 4);
        }

        #[tokio::test]
        async fn test_zero_timeout_still_evaluates_once() {
            let poller = Poller::new();
            let options = PollOptions::new().with_timeout(0).with_interval(10);
            let outcome = poller.wait_until(|| async { Ok(true) }, &options).await;
            assert!(outcome.is_ok());
        }
    }
}
