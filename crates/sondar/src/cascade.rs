//! Ordered selector resolution with one shared time budget.
//!
//! Scripts diagnosing framework-rendered UIs end up with the same loop over
//! candidate selectors in every file; this is that loop, written once. The
//! cascade sweeps the list in priority order and hands back the first
//! element that is both visible and enabled. It never ranks or keeps
//! searching past a match.

use crate::driver::{Driver, ElementHandle};
use crate::result::{SondarError, SondarResult};
use crate::selector::SelectorList;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

/// Default total budget shared across the whole list (5 seconds)
pub const DEFAULT_CASCADE_BUDGET_MS: u64 = 5_000;

/// Default delay between full sweeps of the list (250ms)
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 250;

/// Cascade resolution options
#[derive(Debug, Clone)]
pub struct CascadeOptions {
    /// Total time budget in milliseconds, shared across all selectors
    pub budget_ms: u64,
    /// Delay between sweeps in milliseconds
    pub sweep_interval_ms: u64,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self {
            budget_ms: DEFAULT_CASCADE_BUDGET_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl CascadeOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total budget in milliseconds
    #[must_use]
    pub const fn with_budget(mut self, budget_ms: u64) -> Self {
        self.budget_ms = budget_ms;
        self
    }

    /// Set the sweep interval in milliseconds
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval_ms: u64) -> Self {
        self.sweep_interval_ms = interval_ms;
        self
    }
}

/// Resolves a [`SelectorList`] to the first visible, interactable element
#[derive(Debug, Clone, Default)]
pub struct SelectorCascade {
    options: CascadeOptions,
}

impl SelectorCascade {
    /// Create a cascade with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cascade with the given options
    #[must_use]
    pub const fn with_options(options: CascadeOptions) -> Self {
        Self { options }
    }

    /// Try each selector strictly in list order until one resolves to a
    /// visible, enabled element; tag that element with a fresh marker and
    /// return its handle.
    ///
    /// The whole list shares one time budget. When it runs out without a
    /// match, fails with [`SondarError::NotFound`] listing every selector
    /// tried.
    pub async fn resolve(
        &self,
        driver: &dyn Driver,
        selectors: &SelectorList,
    ) -> SondarResult<ElementHandle> {
        let start = Instant::now();
        let budget = Duration::from_millis(self.options.budget_ms);
        let interval = Duration::from_millis(self.options.sweep_interval_ms);

        loop {
            for selector in selectors.iter() {
                let Some(probe) = driver.query(selector).await? else {
                    trace!(%selector, "no element");
                    continue;
                };
                if !probe.is_interactable() {
                    trace!(%selector, visible = probe.visible, enabled = probe.enabled, "not interactable");
                    continue;
                }
                let marker = Uuid::new_v4().to_string();
                // The element can disappear between probe and tag; treat a
                // failed tag like a miss and keep sweeping.
                if !driver.tag(selector, &marker).await? {
                    continue;
                }
                debug!(%selector, marker = %marker, elapsed_ms = start.elapsed().as_millis() as u64, "resolved");
                return Ok(ElementHandle {
                    marker,
                    selector: selector.clone(),
                    tag_name: probe.tag_name,
                    text: probe.text,
                    bounding_box: probe.bounding_box,
                });
            }

            if start.elapsed() >= budget {
                return Err(SondarError::NotFound {
                    tried: selectors.iter().map(ToString::to_string).collect(),
                });
            }
            tokio::time::sleep(interval).await;
        }
    }
}
