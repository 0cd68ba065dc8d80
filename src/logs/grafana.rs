//! Grafana HTTP API client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use url::Url;

use crate::config::GrafanaConfig;
use crate::logs::{LogsError, LogsResult};

const ORG_HEADER: &str = "x-grafana-org-id";

/// How requests authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    ApiKey(String),
    Basic { username: String, password: String },
    None,
}

impl Auth {
    /// An API key wins; basic auth needs both user and password.
    pub fn from_parts(
        api_key: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        match (api_key.filter(|k| !k.is_empty()), username, password) {
            (Some(key), _, _) => Auth::ApiKey(key),
            (None, Some(username), Some(password)) if !username.is_empty() => {
                Auth::Basic { username, password }
            }
            _ => Auth::None,
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::ApiKey(_) => write!(f, "ApiKey(***)"),
            Auth::Basic { username, .. } => write!(f, "Basic({}, ***)", username),
            Auth::None => write!(f, "None"),
        }
    }
}

/// Connection settings, usually built from `[grafana]` plus flags.
#[derive(Debug, Clone)]
pub struct GrafanaSettings {
    pub url: String,
    pub auth: Auth,
    pub org_id: u64,
    pub verify_ssl: bool,
    pub timeout: Duration,
}

impl GrafanaSettings {
    pub fn from_config(url: String, config: &GrafanaConfig) -> Self {
        Self {
            url,
            auth: Auth::from_parts(
                config.api_key.clone(),
                config.username.clone(),
                config.password.clone(),
            ),
            org_id: config.org_id,
            verify_ssl: config.verify_ssl,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrafanaClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Auth,
}

impl GrafanaClient {
    pub fn new(settings: GrafanaSettings) -> LogsResult<Self> {
        let trimmed = settings.url.trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .map_err(|e| LogsError::InvalidUrl(format!("{}: {}", settings.url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ORG_HEADER, HeaderValue::from(settings.org_id));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .timeout(settings.timeout)
            .build()
            .map_err(|source| LogsError::Http {
                url: trimmed.to_string(),
                source,
            })?;

        tracing::info!(grafana_url = %base_url, auth = ?settings.auth, "Initialized Grafana API client");
        Ok(Self {
            http,
            base_url,
            auth: settings.auth,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// `scheme://host:3100`, where Loki usually listens next to Grafana.
    pub fn colocated_loki_url(&self) -> Option<String> {
        let host = self.base_url.host_str()?;
        Some(format!("{}://{}:3100", self.base_url.scheme(), host))
    }

    /// GET `url` (absolute) with the configured credentials and decode a JSON body.
    pub(crate) async fn get_json(&self, url: &str, query: &[(&str, String)]) -> LogsResult<Value> {
        self.fetch(url, query, true).await
    }

    /// Same as `get_json` without credentials, for endpoints outside Grafana.
    pub(crate) async fn get_json_plain(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> LogsResult<Value> {
        self.fetch(url, query, false).await
    }

    async fn fetch(&self, url: &str, query: &[(&str, String)], with_auth: bool) -> LogsResult<Value> {
        let mut request = self.http.get(url).query(query);
        if with_auth {
            request = match &self.auth {
                Auth::ApiKey(key) => request.bearer_auth(key),
                Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
                Auth::None => request,
            };
        }

        let response = request.send().await.map_err(|source| LogsError::Http {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(500)
                .collect();
            return Err(LogsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        response.json().await.map_err(|source| LogsError::Http {
            url: url.to_string(),
            source,
        })
    }

    /// `/api/health`.
    pub async fn check_connection(&self) -> LogsResult<Value> {
        let health = self.get_json(&self.api_url("/api/health"), &[]).await?;
        tracing::info!(health = %health, "Grafana health check");
        Ok(health)
    }

    pub async fn datasources(&self) -> LogsResult<Vec<Value>> {
        let list = self.get_json(&self.api_url("/api/datasources"), &[]).await?;
        match list {
            Value::Array(items) => Ok(items),
            other => Err(LogsError::InvalidPanel(format!(
                "unexpected datasource list: {}",
                other
            ))),
        }
    }

    pub async fn datasource_by_uid(&self, uid: &str) -> LogsResult<Value> {
        self.get_json(&self.api_url(&format!("/api/datasources/uid/{}", uid)), &[])
            .await
    }

    pub async fn dashboard(&self, uid: &str) -> LogsResult<Value> {
        self.get_json(&self.api_url(&format!("/api/dashboards/uid/{}", uid)), &[])
            .await
    }

    pub async fn dashboard_from_url(&self, dashboard_url: &str) -> LogsResult<Value> {
        let uid = dashboard_uid_from_url(dashboard_url)?;
        tracing::info!(dashboard_uid = %uid, "Extracted dashboard UID");
        self.dashboard(&uid).await
    }
}

/// `http://host/d/<uid>/<slug>?orgId=1` → `<uid>`.
pub fn dashboard_uid_from_url(dashboard_url: &str) -> LogsResult<String> {
    let url = Url::parse(dashboard_url)
        .map_err(|e| LogsError::InvalidUrl(format!("{}: {}", dashboard_url, e)))?;
    let parts: Vec<&str> = url.path().trim_matches('/').split('/').collect();
    match parts.as_slice() {
        ["d", uid, ..] if !uid.is_empty() => Ok(uid.to_string()),
        _ => Err(LogsError::InvalidUrl(format!(
            "Could not extract dashboard UID from URL: {}",
            dashboard_url
        ))),
    }
}

/// Grafana base URL: everything before `/d/`.
pub fn base_url_from_dashboard_url(dashboard_url: &str) -> LogsResult<String> {
    let parts: Vec<&str> = dashboard_url.split("/d/").collect();
    if parts.len() != 2 {
        return Err(LogsError::InvalidUrl(format!(
            "Invalid dashboard URL format: {}",
            dashboard_url
        )));
    }
    Ok(parts[0].to_string())
}
