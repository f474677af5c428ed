//! End-to-end harness behavior against the in-memory driver.

use sondar::{
    Aggregator, CascadeOptions, Condition, DiagnosticEvent, Driver, FailurePolicy, InteractOptions,
    Interactor, MockDriver, MockElement, PollOptions, Poller, RecorderConfig, RunnerOptions,
    Scenario, ScenarioRunner, ScenarioStatus, Selector, SelectorCascade, SelectorList,
    SondarError,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BASE: &str = "http://localhost:8080";

fn fast_runner_options(dir: &std::path::Path) -> RunnerOptions {
    RunnerOptions {
        poll_interval_ms: 10,
        cascade: CascadeOptions::new().with_budget(200).with_sweep_interval(10),
        interact: InteractOptions::new().with_settle(20),
        recorder: RecorderConfig::with_screenshot_dir(dir),
        ..RunnerOptions::default()
    }
}

fn login_page(driver: &MockDriver) {
    driver.insert_element(
        &Selector::css("input[type='email']"),
        MockElement::new("input"),
    );
    driver.insert_element(
        &Selector::css("input[type='password']"),
        MockElement::new("input"),
    );
    driver.insert_element(
        &Selector::css("button[type='submit']"),
        MockElement::new("button").with_text("Sign In"),
    );
    driver.set_body_text("Welcome Back  Email  Password  Sign In");
}

fn customer_login_scenario() -> Scenario {
    Scenario::new("customer-login")
        .navigate(format!("{BASE}/login/customer"))
        .wait_for_within(
            Condition::element_visible(Selector::css("input[type='email']")),
            1_000,
        )
        .locate(Selector::css("input[type='email']"))
        .fill("customer@example.com")
        .locate(Selector::css("input[type='password']"))
        .fill("customer123")
        .locate(Selector::css("button[type='submit']"))
        .click()
        .wait_for_within(Condition::url_contains("/home"), 400)
        .expect(Condition::url_contains("/home"))
}

// =============================================================================
// Cascade ordering (first match wins)
// =============================================================================

#[tokio::test]
async fn cascade_returns_first_matching_selector() {
    let driver = MockDriver::new();
    driver.insert_element(&Selector::css("a"), MockElement::new("a").with_text("A"));
    driver.insert_element(&Selector::css("b"), MockElement::new("b").with_text("B"));

    let cascade = SelectorCascade::new();
    let list = SelectorList::new(Selector::css("a"))
        .or(Selector::css("b"))
        .or(Selector::css("c"));
    let handle = cascade.resolve(&driver, &list).await.unwrap();
    assert_eq!(handle.selector, Selector::css("a"));
    assert_eq!(handle.text, "A");
}

#[tokio::test]
async fn cascade_skips_invisible_and_disabled_candidates() {
    let driver = MockDriver::new();
    driver.insert_element(&Selector::css("a"), MockElement::new("a").hidden());
    driver.insert_element(&Selector::css("b"), MockElement::new("b").disabled());
    driver.insert_element(&Selector::css("c"), MockElement::new("c"));

    let cascade = SelectorCascade::new();
    let list = SelectorList::new(Selector::css("a"))
        .or(Selector::css("b"))
        .or(Selector::css("c"));
    let handle = cascade.resolve(&driver, &list).await.unwrap();
    assert_eq!(handle.selector, Selector::css("c"));
}

#[tokio::test]
async fn cascade_exhaustion_lists_every_selector_tried() {
    let driver = MockDriver::new();
    let cascade =
        SelectorCascade::with_options(CascadeOptions::new().with_budget(50).with_sweep_interval(10));
    let list = SelectorList::new(Selector::css("input[type='email']"))
        .or(Selector::test_id("email"));

    let err = cascade.resolve(&driver, &list).await.unwrap_err();
    match err {
        SondarError::NotFound { tried } => {
            assert_eq!(tried.len(), 2);
            assert!(tried[0].contains("input[type='email']"));
            assert!(tried[1].contains("email"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

// =============================================================================
// Poller termination
// =============================================================================

#[tokio::test]
async fn poller_returns_within_budget_for_never_true_predicate() {
    let poller = Poller::new();
    let options = PollOptions::new().with_timeout(150).with_interval(10);
    let start = Instant::now();
    let result = poller.wait_until(|| async { Ok(false) }, &options).await;
    assert!(result.is_err());
    // Budget plus one interval of slack
    assert!(start.elapsed() < Duration::from_millis(600));
}

// =============================================================================
// Fill readback
// =============================================================================

#[tokio::test]
async fn fill_applies_and_is_idempotent() {
    let driver = MockDriver::new();
    let selector = Selector::css("input[type='email']");
    driver.insert_element(&selector, MockElement::new("input"));

    let cascade = SelectorCascade::new();
    let handle = cascade
        .resolve(&driver, &SelectorList::new(selector))
        .await
        .unwrap();
    let interactor = Interactor::new();

    interactor.fill(&driver, &handle, "x").await.unwrap();
    assert_eq!(driver.read_value(&handle.marker).await.unwrap().unwrap(), "x");

    // Same value again: same observable state
    interactor.fill(&driver, &handle, "x").await.unwrap();
    assert_eq!(driver.read_value(&handle.marker).await.unwrap().unwrap(), "x");
}

#[tokio::test]
async fn fill_readback_mismatch_is_value_not_applied() {
    let driver = MockDriver::new();
    let selector = Selector::css("input");
    driver.insert_element(&selector, MockElement::new("input"));
    driver.reject_fill(&selector);

    let cascade = SelectorCascade::new();
    let handle = cascade
        .resolve(&driver, &SelectorList::new(selector))
        .await
        .unwrap();
    let err = Interactor::new()
        .fill(&driver, &handle, "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, SondarError::ValueNotApplied { .. }));
}

// =============================================================================
// Stale handles
// =============================================================================

#[tokio::test]
async fn click_on_detached_element_is_stale_handle() {
    let driver = MockDriver::new();
    let selector = Selector::css("button");
    driver.insert_element(&selector, MockElement::new("button"));

    let cascade = SelectorCascade::new();
    let handle = cascade
        .resolve(&driver, &SelectorList::new(selector.clone()))
        .await
        .unwrap();

    driver.remove_element(&selector);
    let err = Interactor::with_options(InteractOptions::new().with_settle(1_000))
        .click(&driver, &handle)
        .await
        .unwrap_err();
    assert!(matches!(err, SondarError::StaleHandle { .. }));
}

// =============================================================================
// Continue-on-failure
// =============================================================================

#[tokio::test]
async fn failed_step_does_not_skip_later_steps() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    let runner = ScenarioRunner::new(driver.clone(), fast_runner_options(dir.path()));

    // Step 1 fails (nothing matches), step 2 succeeds
    let scenario = Scenario::new("continue-on-failure")
        .locate(Selector::css("#does-not-exist"))
        .navigate(format!("{BASE}/"));
    let report = runner.run(&scenario).await;

    assert_eq!(report.results.len(), 2);
    assert!(!report.results[0].succeeded);
    assert!(report.results[1].succeeded);
    assert_eq!(driver.navigations(), vec![format!("{BASE}/")]);
    // Ran to completion with no expectations: the run itself succeeded,
    // but a failed step means it does not count as passed
    assert_eq!(report.status, ScenarioStatus::Succeeded);
    assert!(!report.success);
}

#[tokio::test]
async fn fail_fast_stops_after_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    let options = RunnerOptions {
        policy: FailurePolicy::FailFast,
        ..fast_runner_options(dir.path())
    };
    let runner = ScenarioRunner::new(driver.clone(), options);

    let scenario = Scenario::new("fail-fast")
        .locate(Selector::css("#missing"))
        .navigate(format!("{BASE}/"));
    let report = runner.run(&scenario).await;

    assert_eq!(report.results.len(), 1);
    assert!(driver.navigations().is_empty());
}

#[tokio::test]
async fn failed_step_still_gets_a_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    let runner = ScenarioRunner::new(driver, fast_runner_options(dir.path()));

    let scenario = Scenario::new("shot-on-failure").locate(Selector::css("#missing"));
    let report = runner.run(&scenario).await;

    let artifact = report.results[0].artifact.as_ref().unwrap();
    assert!(artifact.exists());
    let name = artifact.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("shot-on-failure_step1_failure_"));
}

// =============================================================================
// Scenario deadline
// =============================================================================

#[tokio::test]
async fn scenario_deadline_cancels_in_flight_waits() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    let options = RunnerOptions {
        scenario_timeout_ms: 100,
        ..fast_runner_options(dir.path())
    };
    let runner = ScenarioRunner::new(driver, options);

    let scenario = Scenario::new("deadline")
        .wait_for_within(Condition::text_visible("never appears"), 60_000);
    let start = Instant::now();
    let report = runner.run(&scenario).await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(report.status, ScenarioStatus::Errored);
    assert!(!report.success);
    assert!(report.error.unwrap().contains("deadline"));
}

// =============================================================================
// Diagnostic capture
// =============================================================================

#[tokio::test]
async fn events_emitted_during_run_land_in_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    let runner = ScenarioRunner::new(driver.clone(), fast_runner_options(dir.path()));

    let emitter = {
        let driver = driver.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            driver.emit(DiagnosticEvent::console("render ok"));
            driver.emit(DiagnosticEvent::page_error("Uncaught TypeError"));
        })
    };

    // Hold the scenario open long enough for the emitter to fire
    let scenario = Scenario::new("diagnostics")
        .wait_for_within(Condition::text_visible("nope"), 150);
    let report = runner.run(&scenario).await;
    emitter.await.unwrap();

    assert_eq!(report.events.len(), 2);
    assert_eq!(report.events[0].message, "render ok");
    assert_eq!(report.events[1].message, "Uncaught TypeError");
}

#[tokio::test]
async fn viewport_is_applied_before_steps() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    let options = fast_runner_options(dir.path()).with_viewport(375, 667);
    let runner = ScenarioRunner::new(driver.clone(), options);

    let report = runner
        .run(&Scenario::new("mobile").navigate(format!("{BASE}/")))
        .await;
    assert!(report.success);
    assert_eq!(driver.viewport(), Some((375, 667)));
}

// =============================================================================
// Screenshot actions
// =============================================================================

#[tokio::test]
async fn screenshot_steps_write_distinct_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    let runner = ScenarioRunner::new(driver, fast_runner_options(dir.path()));

    let scenario = Scenario::new("shots")
        .screenshot("before")
        .screenshot("after");
    let report = runner.run(&scenario).await;

    let first = report.results[0].artifact.clone().unwrap();
    let second = report.results[1].artifact.clone().unwrap();
    assert_ne!(first, second);
    assert!(first.exists());
    assert!(second.exists());
    assert!(first
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("shots_before_"));
}

// =============================================================================
// Worked example: customer login
// =============================================================================

#[tokio::test]
async fn customer_login_passes_when_the_app_redirects() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    login_page(&driver);
    driver.on_click_navigate(&Selector::css("button[type='submit']"), format!("{BASE}/home"));

    let runner = ScenarioRunner::new(driver.clone(), fast_runner_options(dir.path()));
    let report = runner.run(&customer_login_scenario()).await;

    assert_eq!(report.status, ScenarioStatus::Succeeded);
    assert!(report.success, "failed steps: {:#?}", report.results);
    assert_eq!(
        driver.fills(),
        vec![
            (
                "css:input[type='email']".to_string(),
                "customer@example.com".to_string()
            ),
            (
                "css:input[type='password']".to_string(),
                "customer123".to_string()
            ),
        ]
    );

    let mut aggregator = Aggregator::new();
    aggregator.add_report(report).unwrap();
    let aggregate = aggregator.finalize().unwrap();
    assert_eq!(aggregate.summary.total, 1);
    assert_eq!(aggregate.summary.passed, 1);
    assert_eq!(aggregate.summary.failed, 0);
}

#[tokio::test]
async fn customer_login_fails_when_redirect_never_happens() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(MockDriver::new());
    login_page(&driver);
    // No navigation wired to the submit button: login silently does nothing

    let runner = ScenarioRunner::new(driver, fast_runner_options(dir.path()));
    let report = runner.run(&customer_login_scenario()).await;

    assert_eq!(report.status, ScenarioStatus::Failed);
    assert!(!report.success);
    let timed_out = report
        .results
        .iter()
        .find(|r| r.action.contains("url contains /home"))
        .unwrap();
    assert!(!timed_out.succeeded);
    assert!(timed_out.error.as_ref().unwrap().contains("Timed out"));

    let mut aggregator = Aggregator::new();
    aggregator.add_report(report).unwrap();
    let aggregate = aggregator.finalize().unwrap();
    assert_eq!(aggregate.summary.passed, 0);
    assert_eq!(aggregate.summary.failed, 1);
}
