//! Scenario reports and run-level aggregation.
//!
//! The runner hands each finished [`ScenarioReport`] to an [`Aggregator`];
//! `finalize` freezes the collection into an [`AggregateReport`] that can be
//! persisted as JSON and rendered for the console. A finalized aggregate is
//! immutable: further submissions are a caller bug and fail loudly.

use crate::recorder::DiagnosticEvent;
use crate::result::{SondarError, SondarResult};
use crate::runner::ScenarioStatus;
use crate::scenario::ActionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Everything observed while running one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub scenario: String,
    /// Terminal state the run reached
    pub status: ScenarioStatus,
    /// Whether the run counts as passed: it reached `Succeeded`, every
    /// action succeeded, and all expectations held
    pub success: bool,
    /// Total run duration in milliseconds
    pub duration_ms: u64,
    /// Per-action results in submission order
    pub results: Vec<ActionResult>,
    /// Diagnostic events captured during the run, in arrival order
    pub events: Vec<DiagnosticEvent>,
    /// Scenario-level error for `Errored` runs (deadline, driver crash)
    pub error: Option<String>,
}

impl ScenarioReport {
    /// Number of failed actions
    #[must_use]
    pub fn failed_actions(&self) -> usize {
        self.results.iter().filter(|r| !r.succeeded).count()
    }
}

/// Pass/fail counts for a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of scenarios run
    pub total: usize,
    /// Scenarios that passed
    pub passed: usize,
    /// Scenarios that did not pass
    pub failed: usize,
}

/// Frozen result of one harness invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    /// When the aggregate was finalized
    pub timestamp: DateTime<Utc>,
    /// Unique id for this run
    pub run_id: Uuid,
    /// Scenario reports in submission order
    pub scenario_reports: Vec<ScenarioReport>,
    /// Pass/fail counts
    pub summary: Summary,
}

impl AggregateReport {
    /// Persist the aggregate as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> SondarResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Human-readable summary mirroring the structured report.
    ///
    /// Always includes the total/passed/failed line, whatever happened to
    /// the individual scenarios.
    #[must_use]
    pub fn render_console(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "sondar run {}: {} scenario(s), {} passed, {} failed\n",
            self.run_id, self.summary.total, self.summary.passed, self.summary.failed
        ));
        for report in &self.scenario_reports {
            let verdict = if report.success { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "  {verdict} {} ({} step(s), {}ms, {:?})\n",
                report.scenario,
                report.results.len(),
                report.duration_ms,
                report.status,
            ));
            for result in report.results.iter().filter(|r| !r.succeeded) {
                out.push_str(&format!("       step: {}\n", result.action));
                if let Some(error) = &result.error {
                    out.push_str(&format!("       error: {error}\n"));
                }
                if let Some(artifact) = &result.artifact {
                    out.push_str(&format!("       artifact: {}\n", artifact.display()));
                }
            }
            if !report.events.is_empty() {
                out.push_str(&format!(
                    "       {} diagnostic event(s) captured\n",
                    report.events.len()
                ));
            }
        }
        out
    }
}

/// Collects scenario reports and freezes them into an aggregate
#[derive(Debug, Default)]
pub struct Aggregator {
    reports: Vec<ScenarioReport>,
    finalized: bool,
}

impl Aggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a finished scenario report.
    ///
    /// Fails with [`SondarError::Finalized`] after `finalize` has run.
    pub fn add_report(&mut self, report: ScenarioReport) -> SondarResult<()> {
        if self.finalized {
            return Err(SondarError::Finalized);
        }
        self.reports.push(report);
        Ok(())
    }

    /// Number of reports submitted so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether no reports have been submitted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Compute the summary and freeze the aggregate.
    ///
    /// Can run once; a second call (or any later `add_report`) fails with
    /// [`SondarError::Finalized`].
    pub fn finalize(&mut self) -> SondarResult<AggregateReport> {
        if self.finalized {
            return Err(SondarError::Finalized);
        }
        self.finalized = true;
        let scenario_reports = std::mem::take(&mut self.reports);
        let total = scenario_reports.len();
        let passed = scenario_reports.iter().filter(|r| r.success).count();
        Ok(AggregateReport {
            timestamp: Utc::now(),
            run_id: Uuid::new_v4(),
            scenario_reports,
            summary: Summary {
                total,
                passed,
                failed: total - passed,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_report(name: &str) -> ScenarioReport {
        ScenarioReport {
            scenario: name.to_string(),
            status: ScenarioStatus::Succeeded,
            success: true,
            duration_ms: 1_200,
            results: Vec::new(),
            events: Vec::new(),
            error: None,
        }
    }

    fn failing_report(name: &str) -> ScenarioReport {
        ScenarioReport {
            scenario: name.to_string(),
            status: ScenarioStatus::Failed,
            success: false,
            duration_ms: 8_000,
            results: Vec::new(),
            events: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut aggregator = Aggregator::new();
        aggregator.add_report(passing_report("a")).unwrap();
        aggregator.add_report(failing_report("b")).unwrap();
        aggregator.add_report(passing_report("c")).unwrap();
        let aggregate = aggregator.finalize().unwrap();
        assert_eq!(
            aggregate.summary,
            Summary {
                total: 3,
                passed: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn test_submission_order_preserved() {
        let mut aggregator = Aggregator::new();
        aggregator.add_report(passing_report("first")).unwrap();
        aggregator.add_report(passing_report("second")).unwrap();
        let aggregate = aggregator.finalize().unwrap();
        assert_eq!(aggregate.scenario_reports[0].scenario, "first");
        assert_eq!(aggregate.scenario_reports[1].scenario, "second");
    }

    #[test]
    fn test_add_after_finalize_rejected_and_aggregate_unchanged() {
        let mut aggregator = Aggregator::new();
        aggregator.add_report(passing_report("a")).unwrap();
        let aggregate = aggregator.finalize().unwrap();
        let before = aggregate.summary;

        let result = aggregator.add_report(failing_report("late"));
        assert!(matches!(result, Err(SondarError::Finalized)));
        assert_eq!(aggregate.summary, before);
        assert_eq!(aggregate.scenario_reports.len(), 1);
    }

    #[test]
    fn test_double_finalize_rejected() {
        let mut aggregator = Aggregator::new();
        aggregator.finalize().unwrap();
        assert!(matches!(
            aggregator.finalize(),
            Err(SondarError::Finalized)
        ));
    }

    #[test]
    fn test_console_summary_always_has_counts() {
        let mut aggregator = Aggregator::new();
        aggregator.add_report(failing_report("broken")).unwrap();
        let aggregate = aggregator.finalize().unwrap();
        let rendered = aggregate.render_console();
        assert!(rendered.contains("1 scenario(s), 0 passed, 1 failed"));
        assert!(rendered.contains("FAIL broken"));
    }

    #[test]
    fn test_write_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        let mut aggregator = Aggregator::new();
        aggregator.add_report(passing_report("a")).unwrap();
        let aggregate = aggregator.finalize().unwrap();
        aggregate.write_json(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let back: AggregateReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.summary, aggregate.summary);
        assert_eq!(back.run_id, aggregate.run_id);
    }
}
