//! Sondar CLI entry point.

use clap::Parser;
use sondador::{Cli, CliConfig, CliError, CliResult, ProgressReporter};
use sondar::{
    Aggregator, CdpBrowser, DriverConfig, FailurePolicy, RecorderConfig, RunnerOptions,
    ScenarioRunner,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.to_config();
    init_tracing(&config);

    match run(&cli, &config).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &CliConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.verbosity.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the selected suite and return the number of failed scenarios
async fn run(cli: &Cli, config: &CliConfig) -> CliResult<usize> {
    let entries = sondador::build_suite(cli.suite, cli.role, cli.viewport, config.base());
    if entries.is_empty() {
        return Err(CliError::invalid_argument(
            "no scenarios match the given suite and filters",
        ));
    }

    let mut reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let started = Instant::now();

    let mut driver_config = DriverConfig::new().with_headless(config.headless);
    if let Some(ref path) = config.chromium_path {
        driver_config = driver_config.with_executable(path);
    }
    let browser = CdpBrowser::launch(driver_config).await?;

    let mut aggregator = Aggregator::new();
    reporter.start_progress(entries.len() as u64, "running scenarios");

    for entry in &entries {
        reporter.set_message(&entry.scenario.name);
        debug!(scenario = %entry.scenario.name, "opening fresh page");

        // One page per scenario: contexts are never shared between runs
        let driver = Arc::new(browser.new_driver().await?);
        let mut options = RunnerOptions::new()
            .with_scenario_timeout(config.scenario_timeout_ms)
            .with_recorder(RecorderConfig::with_screenshot_dir(&config.output_dir));
        if config.fail_fast {
            options = options.with_policy(FailurePolicy::FailFast);
        }
        if let Some((width, height)) = entry.viewport {
            options = options.with_viewport(width, height);
        }

        let runner = ScenarioRunner::new(driver, options);
        let report = runner.run(&entry.scenario).await;

        let line = format!(
            "{} ({} step(s), {}ms)",
            report.scenario,
            report.results.len(),
            report.duration_ms
        );
        if report.success {
            reporter.success(&line);
        } else {
            reporter.failure(&line);
        }
        reporter.increment(1);
        aggregator.add_report(report).map_err(CliError::from)?;
    }
    reporter.finish();

    if let Err(err) = browser.close().await {
        warn!(%err, "browser did not shut down cleanly");
    }

    let aggregate = aggregator.finalize()?;
    let report_path = config.report_path.clone().unwrap_or_else(|| {
        let stamp = aggregate.timestamp.format("%Y-%m-%dT%H-%M-%S");
        config.output_dir.join(format!("sondar-report_{stamp}.json"))
    });
    aggregate.write_json(&report_path)?;

    println!("{}", aggregate.render_console());
    println!("report: {}", report_path.display());
    reporter.summary(
        aggregate.summary.passed,
        aggregate.summary.failed,
        started.elapsed(),
    );

    Ok(aggregate.summary.failed)
}
