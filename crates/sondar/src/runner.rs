//! Scenario execution.
//!
//! A run moves through `Pending -> Running -> { Succeeded | Failed |
//! Errored }`. Recoverable step failures become data in the result log and
//! the run keeps going; only unexpected errors (driver crash, I/O) or the
//! scenario deadline flip it to `Errored`. Diagnostic runs want maximum
//! information, so continue-on-failure is the default policy.

use crate::cascade::{CascadeOptions, SelectorCascade};
use crate::driver::{Driver, ElementHandle};
use crate::interact::{InteractOptions, Interactor};
use crate::poll::{PollOptions, Poller, DEFAULT_POLL_INTERVAL_MS};
use crate::recorder::{DiagnosticRecorder, RecorderConfig};
use crate::report::ScenarioReport;
use crate::result::{SondarError, SondarResult};
use crate::scenario::{Action, ActionResult, Scenario};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default scenario-level deadline (60 seconds)
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 60_000;

/// Lifecycle state of a scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Not started yet
    Pending,
    /// Steps executing
    Running,
    /// All steps completed and expectations held
    Succeeded,
    /// Steps completed but scenario-level expectations were not met
    Failed,
    /// An unexpected error or the scenario deadline cut the run short
    Errored,
}

impl ScenarioStatus {
    /// Whether the run has reached a terminal state
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Errored)
    }
}

/// What to do when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and keep executing the remaining steps
    #[default]
    Continue,
    /// Stop at the first failed step
    FailFast,
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Step failure policy
    pub policy: FailurePolicy,
    /// Scenario-level deadline in milliseconds
    pub scenario_timeout_ms: u64,
    /// Selector cascade options
    pub cascade: CascadeOptions,
    /// Polling interval for `WaitFor` steps, in milliseconds
    pub poll_interval_ms: u64,
    /// Interaction options
    pub interact: InteractOptions,
    /// Recorder configuration (screenshot directory)
    pub recorder: RecorderConfig,
    /// Viewport applied before the first step, if set
    pub viewport: Option<(u32, u32)>,
    /// Capture a screenshot whenever a step fails
    pub screenshot_on_failure: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::default(),
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            cascade: CascadeOptions::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            interact: InteractOptions::default(),
            recorder: RecorderConfig::default(),
            viewport: None,
            screenshot_on_failure: true,
        }
    }
}

impl RunnerOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure policy
    #[must_use]
    pub const fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the scenario deadline in milliseconds
    #[must_use]
    pub const fn with_scenario_timeout(mut self, timeout_ms: u64) -> Self {
        self.scenario_timeout_ms = timeout_ms;
        self
    }

    /// Set cascade options
    #[must_use]
    pub fn with_cascade(mut self, cascade: CascadeOptions) -> Self {
        self.cascade = cascade;
        self
    }

    /// Set interaction options
    #[must_use]
    pub fn with_interact(mut self, interact: InteractOptions) -> Self {
        self.interact = interact;
        self
    }

    /// Set the recorder configuration
    #[must_use]
    pub fn with_recorder(mut self, recorder: RecorderConfig) -> Self {
        self.recorder = recorder;
        self
    }

    /// Apply a viewport before the first step
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Some((width, height));
        self
    }

    /// Toggle failure screenshots
    #[must_use]
    pub const fn with_screenshot_on_failure(mut self, enabled: bool) -> Self {
        self.screenshot_on_failure = enabled;
        self
    }
}

/// What a successfully executed step produced
enum StepOutcome {
    /// Nothing beyond completion
    Done,
    /// A newly resolved element handle
    Located(ElementHandle),
    /// A written artifact
    Artifact(PathBuf),
    /// The step ran but its condition did not hold
    Unmet(String),
}

/// Drives one scenario at a time against one exclusively-owned driver
pub struct ScenarioRunner {
    driver: Arc<dyn Driver>,
    options: RunnerOptions,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ScenarioRunner {
    /// Create a runner over the given driver
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, options: RunnerOptions) -> Self {
        Self { driver, options }
    }

    /// Execute the scenario to completion and assemble its report.
    ///
    /// Never returns an error: whatever happens ends up inside the
    /// [`ScenarioReport`].
    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        let mut status = ScenarioStatus::Pending;
        let mut scenario_error = None;
        let mut results: Vec<ActionResult> = Vec::new();

        let mut recorder = DiagnosticRecorder::new(self.options.recorder.clone());
        recorder.attach(self.driver.as_ref());

        info!(scenario = %scenario.name, steps = scenario.len(), ?status, "scenario starting");
        status = ScenarioStatus::Running;

        if let Some((width, height)) = self.options.viewport {
            if let Err(err) = self.driver.set_viewport(width, height).await {
                warn!(scenario = %scenario.name, %err, "viewport setup failed");
                scenario_error = Some(err.to_string());
                status = ScenarioStatus::Errored;
            }
        }

        if status != ScenarioStatus::Errored {
            let deadline = Duration::from_millis(self.options.scenario_timeout_ms);
            let execution = tokio::time::timeout(
                deadline,
                self.execute_steps(scenario, &recorder, &mut results),
            )
            .await;

            status = match execution {
                Ok(Ok(())) => self.check_expectations(scenario).await,
                Ok(Err(err)) => {
                    warn!(scenario = %scenario.name, %err, "unexpected error escaped a step");
                    scenario_error = Some(err.to_string());
                    ScenarioStatus::Errored
                }
                Err(_) => {
                    let err = SondarError::ScenarioTimeout {
                        scenario: scenario.name.clone(),
                        budget_ms: self.options.scenario_timeout_ms,
                    };
                    warn!(scenario = %scenario.name, %err, "deadline exceeded, in-flight waits cancelled");
                    scenario_error = Some(err.to_string());
                    ScenarioStatus::Errored
                }
            };
        }

        let all_steps_ok = results.iter().all(|r| r.succeeded);
        let success = status == ScenarioStatus::Succeeded && all_steps_ok;
        info!(scenario = %scenario.name, ?status, success, "scenario finished");

        ScenarioReport {
            scenario: scenario.name.clone(),
            status,
            success,
            duration_ms: started.elapsed().as_millis() as u64,
            results,
            events: recorder.drain(),
            error: scenario_error,
        }
    }

    /// Evaluate scenario-level expectations after all steps finish
    async fn check_expectations(&self, scenario: &Scenario) -> ScenarioStatus {
        for condition in &scenario.expectations {
            let held = match condition.evaluate(self.driver.as_ref()).await {
                Ok(held) => held,
                Err(err) => {
                    warn!(
                        scenario = %scenario.name,
                        condition = %condition.description(),
                        %err,
                        "expectation check failed to evaluate"
                    );
                    false
                }
            };
            if !held {
                debug!(
                    scenario = %scenario.name,
                    condition = %condition.description(),
                    "expectation not met"
                );
                return ScenarioStatus::Failed;
            }
        }
        ScenarioStatus::Succeeded
    }

    /// Run every step, converting recoverable failures into result entries.
    ///
    /// Returns Err only for errors that should error the whole scenario.
    async fn execute_steps(
        &self,
        scenario: &Scenario,
        recorder: &DiagnosticRecorder,
        results: &mut Vec<ActionResult>,
    ) -> SondarResult<()> {
        let cascade = SelectorCascade::with_options(self.options.cascade.clone());
        let interactor = Interactor::with_options(self.options.interact.clone());
        let poller = Poller::new();
        let mut current: Option<ElementHandle> = None;

        for (index, action) in scenario.steps.iter().enumerate() {
            let step_started = Instant::now();
            debug!(scenario = %scenario.name, step = index + 1, action = %action.describe(), "step starting");

            let outcome = self
                .execute_action(scenario, action, &cascade, &interactor, &poller, recorder, &current)
                .await;
            let elapsed_ms = step_started.elapsed().as_millis() as u64;

            match outcome {
                Ok(StepOutcome::Done) => results.push(ActionResult::ok(action, elapsed_ms)),
                Ok(StepOutcome::Located(handle)) => {
                    current = Some(handle);
                    results.push(ActionResult::ok(action, elapsed_ms));
                }
                Ok(StepOutcome::Artifact(path)) => {
                    results.push(ActionResult::ok(action, elapsed_ms).with_artifact(path));
                }
                Ok(StepOutcome::Unmet(message)) => {
                    let result = ActionResult::failed(action, elapsed_ms, message);
                    let result = self
                        .attach_failure_screenshot(scenario, index, recorder, result)
                        .await;
                    results.push(result);
                    if self.options.policy == FailurePolicy::FailFast {
                        return Ok(());
                    }
                }
                Err(err) if err.is_recoverable() => {
                    debug!(scenario = %scenario.name, step = index + 1, %err, "step failed");
                    let result = ActionResult::failed(action, elapsed_ms, err.to_string());
                    let result = self
                        .attach_failure_screenshot(scenario, index, recorder, result)
                        .await;
                    results.push(result);
                    if self.options.policy == FailurePolicy::FailFast {
                        return Ok(());
                    }
                }
                Err(err) => {
                    // Record the step before letting the error escape so the
                    // report still shows where the run died.
                    results.push(ActionResult::failed(action, elapsed_ms, err.to_string()));
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_action(
        &self,
        scenario: &Scenario,
        action: &Action,
        cascade: &SelectorCascade,
        interactor: &Interactor,
        poller: &Poller,
        recorder: &DiagnosticRecorder,
        current: &Option<ElementHandle>,
    ) -> SondarResult<StepOutcome> {
        match action {
            Action::Navigate { url } => {
                self.driver.navigate(url).await?;
                Ok(StepOutcome::Done)
            }
            Action::WaitFor {
                condition,
                timeout_ms,
            } => {
                let options = PollOptions::new()
                    .with_timeout(*timeout_ms)
                    .with_interval(self.options.poll_interval_ms);
                poller
                    .wait_for(self.driver.as_ref(), condition, &options)
                    .await?;
                Ok(StepOutcome::Done)
            }
            Action::Locate { selectors } => {
                let handle = cascade.resolve(self.driver.as_ref(), selectors).await?;
                Ok(StepOutcome::Located(handle))
            }
            Action::Click => {
                let handle = require_handle(current, "click")?;
                let outcome = interactor.click(self.driver.as_ref(), handle).await?;
                debug!(
                    scenario = %scenario.name,
                    navigation_occurred = outcome.navigation_occurred,
                    url = %outcome.url_after,
                    "click settled"
                );
                Ok(StepOutcome::Done)
            }
            Action::Fill { value } => {
                let handle = require_handle(current, "fill")?;
                interactor.fill(self.driver.as_ref(), handle, value).await?;
                Ok(StepOutcome::Done)
            }
            Action::Hover => {
                let handle = require_handle(current, "hover")?;
                interactor.hover(self.driver.as_ref(), handle).await?;
                Ok(StepOutcome::Done)
            }
            Action::Assert { condition } => {
                if condition.evaluate(self.driver.as_ref()).await? {
                    Ok(StepOutcome::Done)
                } else {
                    Ok(StepOutcome::Unmet(format!(
                        "condition not met: {}",
                        condition.description()
                    )))
                }
            }
            Action::Screenshot { label } => {
                let path = recorder
                    .flush_screenshot(self.driver.as_ref(), &format!("{}_{label}", scenario.name))
                    .await?;
                Ok(StepOutcome::Artifact(path))
            }
        }
    }

    /// Failure paths still attempt a screenshot before the result is final
    async fn attach_failure_screenshot(
        &self,
        scenario: &Scenario,
        step_index: usize,
        recorder: &DiagnosticRecorder,
        result: ActionResult,
    ) -> ActionResult {
        if !self.options.screenshot_on_failure {
            return result;
        }
        let label = format!("{}_step{}_failure", scenario.name, step_index + 1);
        match recorder.flush_screenshot(self.driver.as_ref(), &label).await {
            Ok(path) => result.with_artifact(path),
            Err(err) => {
                warn!(scenario = %scenario.name, %err, "failure screenshot could not be captured");
                result
            }
        }
    }
}

/// A click/fill/hover with nothing located beforehand is a scripting
/// mistake the scenario should surface as a failed step, not a crash.
fn require_handle<'a>(
    current: &'a Option<ElementHandle>,
    action: &str,
) -> SondarResult<&'a ElementHandle> {
    current.as_ref().ok_or_else(|| SondarError::Interaction {
        action: action.to_string(),
        selector: "<none>".to_string(),
        message: "no element located before this step".to_string(),
    })
}
