//! Element interactions with pre- and post-condition checks.
//!
//! Handles can go stale between locate and act (navigation, re-render), and
//! framework-synthesized inputs sometimes swallow programmatic writes. Each
//! interaction re-verifies the handle first and confirms its effect after.
//! Nothing here retries; repeating an action is the caller's decision.

use crate::driver::{Driver, ElementHandle};
use crate::result::{SondarError, SondarResult};
use std::time::Duration;
use tracing::debug;

/// Default settle delay after a click (1.5 seconds).
///
/// Navigation triggered by a click is asynchronous; the delay gives the page
/// time to move before the post-click URL is read. Sensible values sit in
/// the 1000-3000ms range.
pub const DEFAULT_SETTLE_MS: u64 = 1_500;

/// Interaction options
#[derive(Debug, Clone)]
pub struct InteractOptions {
    /// Settle delay after a click, in milliseconds
    pub settle_ms: u64,
}

impl Default for InteractOptions {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl InteractOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the settle delay in milliseconds
    #[must_use]
    pub const fn with_settle(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }
}

/// What a click observed about navigation
#[derive(Debug, Clone)]
pub struct ClickOutcome {
    /// URL immediately before the click
    pub url_before: String,
    /// URL after the click and settle delay
    pub url_after: String,
    /// Whether the URL changed across the click
    pub navigation_occurred: bool,
}

/// Performs click/fill/hover against a resolved handle
#[derive(Debug, Clone, Default)]
pub struct Interactor {
    options: InteractOptions,
}

impl Interactor {
    /// Create an interactor with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interactor with the given options
    #[must_use]
    pub const fn with_options(options: InteractOptions) -> Self {
        Self { options }
    }

    /// Confirm the handle still points at a visible, enabled element
    async fn reverify(&self, driver: &dyn Driver, handle: &ElementHandle) -> SondarResult<()> {
        let Some(probe) = driver.probe_marker(&handle.marker).await? else {
            return Err(SondarError::StaleHandle {
                selector: handle.describe(),
            });
        };
        if !probe.visible {
            return Err(SondarError::NotInteractable {
                selector: handle.describe(),
                reason: "hidden".to_string(),
            });
        }
        if !probe.enabled {
            return Err(SondarError::NotInteractable {
                selector: handle.describe(),
                reason: "disabled".to_string(),
            });
        }
        Ok(())
    }

    /// Click the element, then wait out the settle delay and report whether
    /// the URL changed.
    pub async fn click(
        &self,
        driver: &dyn Driver,
        handle: &ElementHandle,
    ) -> SondarResult<ClickOutcome> {
        self.reverify(driver, handle).await?;
        let url_before = driver.current_url().await?;

        driver
            .click_marker(&handle.marker)
            .await
            .map_err(|err| wrap_driver_error(err, "click", handle))?;

        tokio::time::sleep(Duration::from_millis(self.options.settle_ms)).await;
        let url_after = driver.current_url().await?;
        let navigation_occurred = url_after != url_before;
        debug!(
            selector = %handle.describe(),
            navigation_occurred,
            url_after = %url_after,
            "click complete"
        );
        Ok(ClickOutcome {
            url_before,
            url_after,
            navigation_occurred,
        })
    }

    /// Write a value into the element and read it back to confirm it stuck.
    ///
    /// Inputs that silently reject programmatic writes fail with
    /// [`SondarError::ValueNotApplied`], distinct from click failures.
    pub async fn fill(
        &self,
        driver: &dyn Driver,
        handle: &ElementHandle,
        value: &str,
    ) -> SondarResult<()> {
        self.reverify(driver, handle).await?;

        driver
            .fill_marker(&handle.marker, value)
            .await
            .map_err(|err| wrap_driver_error(err, "fill", handle))?;

        let Some(actual) = driver.read_value(&handle.marker).await? else {
            return Err(SondarError::StaleHandle {
                selector: handle.describe(),
            });
        };
        if actual != value {
            return Err(SondarError::ValueNotApplied {
                expected: value.to_string(),
                actual,
            });
        }
        debug!(selector = %handle.describe(), "fill verified");
        Ok(())
    }

    /// Hover over the element
    pub async fn hover(&self, driver: &dyn Driver, handle: &ElementHandle) -> SondarResult<()> {
        self.reverify(driver, handle).await?;
        driver
            .hover_marker(&handle.marker)
            .await
            .map_err(|err| wrap_driver_error(err, "hover", handle))
    }
}

/// Wrap a raw driver failure with the action and selector context.
/// Stale/not-interactable outcomes pass through untouched so callers can
/// tell them apart and re-resolve.
fn wrap_driver_error(err: SondarError, action: &str, handle: &ElementHandle) -> SondarError {
    match err {
        err @ (SondarError::StaleHandle { .. } | SondarError::NotInteractable { .. }) => err,
        other => SondarError::Interaction {
            action: action.to_string(),
            selector: handle.describe(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settle_in_documented_range() {
        let options = InteractOptions::default();
        assert!((1_000..=3_000).contains(&options.settle_ms));
    }

    #[test]
    fn test_settle_override() {
        let options = InteractOptions::new().with_settle(2_500);
        assert_eq!(options.settle_ms, 2_500);
    }
}
