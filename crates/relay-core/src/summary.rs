//! Test-result counters from a Playwright JSON report.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::SummaryError;

/// Location of the JSON report relative to the workspace.
pub const DEFAULT_REPORT_PATH: &str = "playwright-report/results.json";

/// Aggregated test counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestCounters {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub flaky: u64,
    pub skipped: u64,
}

impl TestCounters {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Deserialize)]
struct Report {
    stats: Option<Stats>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Stats {
    expected: u64,
    unexpected: u64,
    flaky: u64,
    skipped: u64,
}

/// Report path inside `workspace` (current directory when unset).
pub fn report_path(workspace: Option<&str>) -> PathBuf {
    Path::new(workspace.filter(|w| !w.is_empty()).unwrap_or(".")).join(DEFAULT_REPORT_PATH)
}

/// Parse the `stats` block of a report.
pub fn parse_report(raw: &str) -> Result<TestCounters, SummaryError> {
    let report: Report = serde_json::from_str(raw)?;
    let stats = report.stats.ok_or(SummaryError::MissingStats)?;

    Ok(TestCounters {
        total: stats.expected + stats.unexpected + stats.flaky + stats.skipped,
        passed: stats.expected,
        failed: stats.unexpected,
        flaky: stats.flaky,
        skipped: stats.skipped,
    })
}

/// Read and parse a report file.
pub fn load_report(path: &Path) -> Result<TestCounters, SummaryError> {
    info!(path = %path.display(), "reading test results");
    if !path.exists() {
        return Err(SummaryError::NotFound(path.to_path_buf()));
    }
    let counters = parse_report(&std::fs::read_to_string(path)?)?;
    info!(
        passed = counters.passed,
        failed = counters.failed,
        flaky = counters.flaky,
        skipped = counters.skipped,
        "parsed test results"
    );
    Ok(counters)
}
