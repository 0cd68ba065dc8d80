//! LogQL range queries through Grafana.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logs::grafana::GrafanaClient;
use crate::logs::{LogsError, LogsResult};

const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";

pub const DEFAULT_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Direction {
    /// Newest first.
    #[default]
    #[value(name = "BACKWARD")]
    Backward,
    #[value(name = "FORWARD")]
    Forward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Backward => "BACKWARD",
            Direction::Forward => "FORWARD",
        }
    }
}

/// One log line with its stream labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Nanoseconds since the epoch, as Loki returns it.
    pub timestamp: String,
    /// Local ISO-8601 rendering of `timestamp`.
    pub datetime: String,
    pub labels: Map<String, Value>,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct LokiQuery {
    pub query: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: u32,
    pub direction: Direction,
}

impl LokiQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.query.clone()),
            ("start", self.start.timestamp().to_string()),
            ("end", self.end.timestamp().to_string()),
            ("limit", self.limit.to_string()),
            ("direction", self.direction.as_str().to_string()),
        ]
    }
}

/// Substitute `$instance` (or drop the label when no value is given), remove
/// empty line filters, trim.
pub fn prepare_query(query: &str, instance: Option<&str>) -> String {
    let mut query = query.to_string();
    if query.contains("$instance") {
        match instance.filter(|v| !v.is_empty()) {
            Some(value) => query = query.replace("$instance", value),
            None => {
                query = query.replace("instance=\"$instance\", ", "");
                query = query.replace("instance=\"$instance\"", "");
            }
        }
    }
    query.replace("|= ``", "").trim().to_string()
}

/// Render a nanosecond timestamp in local time.
pub fn format_timestamp(nanos: &str) -> String {
    let Ok(ns) = nanos.parse::<i128>() else {
        return nanos.to_string();
    };
    let secs = ns.div_euclid(1_000_000_000) as i64;
    let sub = ns.rem_euclid(1_000_000_000) as u32;
    match DateTime::from_timestamp(secs, sub) {
        Some(dt) => dt
            .with_timezone(&Local)
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
        None => nanos.to_string(),
    }
}

/// Flatten a `query_range` response into entries sorted for `direction`.
pub fn process_response(response: &Value, direction: Direction) -> Vec<LogEntry> {
    let Some(streams) = response
        .get("data")
        .and_then(|d| d.get("result"))
        .and_then(Value::as_array)
    else {
        tracing::error!(response = %response, "Unexpected response format");
        return Vec::new();
    };

    let mut entries = Vec::new();
    for stream in streams {
        let labels = stream
            .get("stream")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let values = stream.get("values").and_then(Value::as_array);
        for pair in values.into_iter().flatten() {
            let (Some(ts), Some(line)) = (
                pair.get(0).and_then(Value::as_str),
                pair.get(1).and_then(Value::as_str),
            ) else {
                continue;
            };
            entries.push(LogEntry {
                timestamp: ts.to_string(),
                datetime: format_timestamp(ts),
                labels: labels.clone(),
                log: line.to_string(),
            });
        }
    }

    entries.sort_by_key(|e| e.timestamp.parse::<u128>().unwrap_or(0));
    if direction == Direction::Backward {
        entries.reverse();
    }
    entries
}

/// Run `query` against the Loki datasource `datasource_uid`.
///
/// Tried in order: the Grafana proxy by uid, the proxy by numeric id, the
/// datasource's own URL, and Loki on the Grafana host at port 3100.
pub async fn query_range(
    client: &GrafanaClient,
    datasource_uid: &str,
    query: &LokiQuery,
) -> LogsResult<Vec<LogEntry>> {
    let params = query.params();
    tracing::info!(
        datasource_uid = %datasource_uid,
        query = %query.query,
        start = query.start.timestamp(),
        end = query.end.timestamp(),
        limit = query.limit,
        direction = query.direction.as_str(),
        "Querying Loki"
    );
    let mut errors = Vec::new();

    let by_uid = client.api_url(&format!(
        "/api/datasources/proxy/uid/{}{}",
        datasource_uid, QUERY_RANGE_PATH
    ));
    match client.get_json(&by_uid, &params).await {
        Ok(body) => return Ok(process_response(&body, query.direction)),
        Err(e) => {
            tracing::warn!(error = %e, "Grafana proxy by uid failed");
            errors.push(format!("Error with Grafana proxy by uid: {}", e));
        }
    }

    let datasource = match client.datasource_by_uid(datasource_uid).await {
        Ok(ds) => Some(ds),
        Err(e) => {
            tracing::debug!(error = %e, "Datasource lookup by uid failed, listing datasources");
            match client.datasources().await {
                Ok(list) => list
                    .into_iter()
                    .find(|ds| ds.get("uid").and_then(Value::as_str) == Some(datasource_uid)),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not list datasources");
                    None
                }
            }
        }
    };

    match datasource.as_ref().and_then(|ds| ds.get("id")).and_then(Value::as_u64) {
        Some(id) => {
            let by_id = client.api_url(&format!("/api/datasources/proxy/{}{}", id, QUERY_RANGE_PATH));
            tracing::info!(url = %by_id, "Trying Grafana proxy URL with ID");
            match client.get_json(&by_id, &params).await {
                Ok(body) => return Ok(process_response(&body, query.direction)),
                Err(e) => errors.push(format!("Error with Grafana proxy: {}", e)),
            }
        }
        None => errors.push(format!(
            "Error with Grafana proxy: Could not find datasource ID for UID {}",
            datasource_uid
        )),
    }

    let datasource_url = datasource
        .as_ref()
        .and_then(|ds| ds.get("url"))
        .and_then(Value::as_str)
        .filter(|u| u.starts_with("http"))
        .map(|u| u.trim_end_matches('/').to_string());
    match datasource_url {
        Some(url) => {
            let direct = format!("{}{}", url, QUERY_RANGE_PATH);
            tracing::info!(url = %direct, "Trying direct datasource URL");
            match client.get_json_plain(&direct, &params).await {
                Ok(body) => return Ok(process_response(&body, query.direction)),
                Err(e) => errors.push(format!("Error with direct URL: {}", e)),
            }
        }
        None => errors.push("Error with direct URL: datasource has no absolute URL".to_string()),
    }

    if let Some(loki) = client.colocated_loki_url() {
        let same_host = format!("{}{}", loki, QUERY_RANGE_PATH);
        tracing::info!(url = %same_host, "Trying Loki on same host");
        match client.get_json_plain(&same_host, &params).await {
            Ok(body) => return Ok(process_response(&body, query.direction)),
            Err(e) => errors.push(format!("Error with Loki on same host: {}", e)),
        }
    }

    for error in &errors {
        tracing::warn!("{}", error);
    }
    Err(LogsError::AllQueriesFailed(errors))
}
