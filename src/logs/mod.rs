//! Log download from Grafana-fronted Loki.
//!
//! # Data Flow
//! ```text
//! --dashboard-url | --panel-file | --panel-json | --query | --service
//!     → panel.rs (logs panels, datasource uid + LogQL expression)
//!     → timerange.rs (--hours window, --start-time / --end-time overrides)
//!     → loki.rs (prepare query, query_range with fallbacks, sort)
//!         grafana.rs: proxy by uid → proxy by id → datasource URL → host:3100
//!     → output.rs (json / txt file, console preview)
//! ```
//!
//! # Design Decisions
//! - Every fallback failure is collected and reported together
//! - Auth is an API key (Bearer) or basic credentials, never both

pub mod grafana;
pub mod loki;
pub mod output;
pub mod panel;
pub mod timerange;

use std::path::PathBuf;

use thiserror::Error;

pub use grafana::{Auth, GrafanaClient, GrafanaSettings};
pub use loki::{prepare_query, process_response, query_range, Direction, LogEntry, LokiQuery};
pub use output::{preview, save_logs, OutputFormat};
pub use panel::{logs_panels, panel_target, service_panel, PanelTarget};
pub use timerange::{parse_time_spec, TimeRange};

#[derive(Debug, Error)]
pub enum LogsError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid panel configuration: {0}")]
    InvalidPanel(String),

    #[error("No logs panels found in the dashboard")]
    NoLogsPanels,

    #[error("Panel index {index} out of range. Dashboard has {count} logs panels.")]
    PanelIndex { index: usize, count: usize },

    #[error("Invalid time '{0}': expected <n>[smhd] or an ISO-8601 timestamp")]
    InvalidTime(String),

    #[error("All approaches to connect to Loki failed: {}", .0.join("; "))]
    AllQueriesFailed(Vec<String>),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LogsResult<T> = Result<T, LogsError>;
