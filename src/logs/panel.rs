//! Dashboard panel discovery and query extraction.

use serde_json::{json, Value};

use crate::logs::{LogsError, LogsResult};

pub const DEFAULT_SERVICE: &str = "execution";
pub const DEFAULT_DATASOURCE_UID: &str = "loki_ds_1";

/// Where a panel's logs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelTarget {
    pub datasource_uid: String,
    pub query: String,
}

/// Every panel in a dashboard API response.
///
/// Covers top-level `panels`, legacy `rows[].panels` and the children of
/// collapsed rows.
pub fn panels(dashboard: &Value) -> Vec<Value> {
    let body = dashboard.get("dashboard").unwrap_or(dashboard);
    let mut found = Vec::new();

    for panel in array(body, "panels") {
        if panel.get("type").and_then(Value::as_str) == Some("row") {
            found.extend(array(panel, "panels").iter().cloned());
        }
        found.push(panel.clone());
    }
    for row in array(body, "rows") {
        found.extend(array(row, "panels").iter().cloned());
    }
    found
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Panels with `type == "logs"`.
pub fn logs_panels(dashboard: &Value) -> Vec<Value> {
    panels(dashboard)
        .into_iter()
        .filter(|p| p.get("type").and_then(Value::as_str) == Some("logs"))
        .collect()
}

/// Pick the `index`-th logs panel.
pub fn select_logs_panel(dashboard: &Value, index: usize) -> LogsResult<Value> {
    let mut logs = logs_panels(dashboard);
    if logs.is_empty() {
        return Err(LogsError::NoLogsPanels);
    }
    if index >= logs.len() {
        return Err(LogsError::PanelIndex {
            index,
            count: logs.len(),
        });
    }
    Ok(logs.swap_remove(index))
}

fn datasource_uid(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(uid) if !uid.is_empty() => Some(uid.clone()),
        Value::Object(obj) => obj
            .get("uid")
            .and_then(Value::as_str)
            .filter(|uid| !uid.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Datasource uid (panel, else first target) and the first target's query
/// (`expr`, `query` or `expression`).
pub fn panel_target(panel: &Value) -> LogsResult<PanelTarget> {
    let targets = array(panel, "targets");
    let first = targets.first();

    let datasource_uid = datasource_uid(panel.get("datasource"))
        .or_else(|| datasource_uid(first.and_then(|t| t.get("datasource"))))
        .ok_or_else(|| {
            LogsError::InvalidPanel("No datasource UID found in panel configuration".to_string())
        })?;

    let target = first.ok_or_else(|| {
        LogsError::InvalidPanel("No targets found in panel configuration".to_string())
    })?;
    let query = ["expr", "query", "expression"]
        .iter()
        .find_map(|field| target.get(*field).and_then(Value::as_str))
        .filter(|q| !q.is_empty())
        .ok_or_else(|| LogsError::InvalidPanel("No query expression found in panel target".to_string()))?;

    tracing::info!(datasource_uid = %datasource_uid, query = %query, "Extracted panel target");
    Ok(PanelTarget {
        datasource_uid,
        query: query.to_string(),
    })
}

/// Synthetic logs panel for a service, or for a custom query.
pub fn service_panel(service: &str, query: Option<&str>, datasource_uid: &str) -> Value {
    let expr = match query {
        Some(q) => q.to_string(),
        None => format!("{{container_name=\"{}\"}}", service),
    };
    let datasource = json!({"type": "loki", "uid": datasource_uid});
    json!({
        "datasource": datasource,
        "targets": [{
            "datasource": datasource,
            "expr": expr,
            "queryType": "range",
            "refId": "A"
        }],
        "title": capitalize(service),
        "type": "logs"
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
