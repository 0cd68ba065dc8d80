//! CI test result notifications.
//!
//! # Data Flow
//! ```text
//! reports/<name>.json (pytest-json-report)
//!     → TestReport (summary, failed test names)
//!     → verdict (fail when passed < total - skipped)
//!     → slack.rs (attachment fields + footer)
//!     → incoming webhook POST (failures only unless always_post)
//! ```

pub mod slack;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use slack::{MessageParts, SlackMessage, SlackWebhook};

pub const REPORTS_DIR: &str = "reports";
pub const DEFAULT_DESCRIPTION: &str = "Auto tests";
const ARTIFACTS_PATH: &str = "#artifacts";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No Slack webhook URL configured")]
    MissingWebhook,

    #[error("Report file not found: {path}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in report file {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to send Slack notification: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Slack rejected the notification (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Verdict {
    #[default]
    Pass,
    Fail,
}

impl Verdict {
    /// Attachment colour.
    pub fn color(&self) -> &'static str {
        match self {
            Verdict::Pass => "good",
            Verdict::Fail => "warning",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub nodeid: String,
    pub outcome: String,
}

/// The parts of a pytest JSON report we read.
#[derive(Debug, Clone, Deserialize)]
pub struct TestReport {
    pub summary: Map<String, Value>,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

impl TestReport {
    pub fn load(path: &Path) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            tracing::error!(path = %path.display(), "Report file not found");
            ReportError::NotFound {
                path: path.to_path_buf(),
                source,
            }
        })?;
        serde_json::from_str(&content).map_err(|source| {
            tracing::error!(path = %path.display(), "Invalid JSON in report file");
            ReportError::InvalidJson {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn count(&self, key: &str) -> Option<i64> {
        self.summary.get(key).and_then(Value::as_i64)
    }

    pub fn verdict(&self) -> Verdict {
        let total = self.count("total").unwrap_or(0);
        let skipped = self.count("skipped").unwrap_or(0);
        match self.count("passed") {
            Some(passed) if passed >= total - skipped => Verdict::Pass,
            _ => Verdict::Fail,
        }
    }

    /// Test function names (the part after `::`) of failed tests.
    pub fn failed_tests(&self) -> Vec<String> {
        self.tests
            .iter()
            .filter(|t| t.outcome == "failed")
            .map(|t| {
                t.nodeid
                    .split("::")
                    .nth(1)
                    .unwrap_or(&t.nodeid)
                    .to_string()
            })
            .collect()
    }

    pub fn summary_json(&self) -> String {
        Value::Object(self.summary.clone()).to_string()
    }
}

/// `reports/<name>.json` under `dir`.
pub fn report_path(dir: &Path, report_name: &str) -> PathBuf {
    dir.join(format!("{}.json", report_name))
}

/// Inputs for a result notification.
#[derive(Debug, Clone)]
pub struct ResultsRequest {
    pub description: String,
    /// Skips reading the report when given.
    pub summary: Option<String>,
    pub timestamp: Option<String>,
    pub verdict: Verdict,
    pub always_post: bool,
    pub job_url: Option<String>,
    pub report_name: String,
    pub reports_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsOutcome {
    pub verdict: Verdict,
    pub message: SlackMessage,
    pub posted: bool,
}

/// Work out the verdict and message for a test run.
pub fn prepare_results(request: &ResultsRequest) -> ReportResult<(Verdict, SlackMessage)> {
    let mut verdict = request.verdict;
    let mut summary = request.summary.clone();
    let mut additional_info = None;

    if summary.as_deref().map_or(true, str::is_empty) {
        let report = TestReport::load(&report_path(&request.reports_dir, &request.report_name))?;
        summary = Some(report.summary_json());
        if report.verdict() == Verdict::Fail {
            verdict = Verdict::Fail;
            additional_info = Some(format!("Failed tests: {}", report.failed_tests().join(", ")));
        }
    }

    let timestamp = request.timestamp.clone().unwrap_or_else(|| {
        chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
    });
    let job_url = request.job_url.as_deref().filter(|u| !u.is_empty());

    let parts = MessageParts {
        description: Some(request.description.clone()),
        summary,
        timestamp: Some(timestamp),
        additional_info,
        pipeline_link: job_url.map(str::to_string),
        report_link: job_url.map(|u| format!("{}/{}", u, ARTIFACTS_PATH)),
        ..MessageParts::default()
    };
    Ok((verdict, parts.build(verdict)))
}

/// Post a test run result. Passing runs are only posted with `always_post`.
pub async fn send_results(
    webhook: &SlackWebhook,
    request: &ResultsRequest,
) -> ReportResult<ResultsOutcome> {
    tracing::info!("Sending report to Slack channel");
    let (verdict, message) = prepare_results(request)?;

    let posted = request.always_post || verdict == Verdict::Fail;
    if posted {
        webhook.post(&message).await?;
    } else {
        tracing::warn!("Skipped sending report to slack");
    }
    Ok(ResultsOutcome {
        verdict,
        message,
        posted,
    })
}
