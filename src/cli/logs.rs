//! `chainops logs`

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use serde_json::Value;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::logs::grafana::base_url_from_dashboard_url;
use crate::logs::loki::DEFAULT_LIMIT;
use crate::logs::panel::{select_logs_panel, DEFAULT_DATASOURCE_UID, DEFAULT_SERVICE};
use crate::logs::{
    panel_target, prepare_query, preview, query_range, save_logs, service_panel, Auth, Direction,
    GrafanaClient, GrafanaSettings, LogsError, LokiQuery, OutputFormat, PanelTarget, TimeRange,
};

const PREVIEW_ENTRIES: usize = 5;

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Grafana base URL, overrides `grafana.url`
    #[arg(long)]
    pub grafana_url: Option<String>,

    /// Dashboard URL (`.../d/<uid>/...`); also supplies the base URL
    #[arg(long)]
    pub dashboard_url: Option<String>,

    /// Which logs panel of the dashboard to use
    #[arg(long, default_value_t = 0)]
    pub panel_index: usize,

    /// Panel configuration JSON file
    #[arg(long)]
    pub panel_file: Option<PathBuf>,

    /// Panel configuration as a JSON string
    #[arg(long)]
    pub panel_json: Option<String>,

    /// LogQL query
    #[arg(long)]
    pub query: Option<String>,

    /// Loki datasource uid for `--query` and `--service`
    #[arg(long, default_value = DEFAULT_DATASOURCE_UID)]
    pub datasource_uid: String,

    /// Container whose logs are fetched when no other source is given
    #[arg(long, default_value = DEFAULT_SERVICE)]
    pub service: String,

    /// Grafana API key
    #[arg(long, env = "GRAFANA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Basic auth user
    #[arg(long)]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long)]
    pub password: Option<String>,

    /// Organization id
    #[arg(long)]
    pub org_id: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub no_verify_ssl: bool,

    /// Window ending now, in hours
    #[arg(long, default_value_t = 1)]
    pub hours: u64,

    /// Start time: `<n>[smhd]` ago or ISO-8601
    #[arg(long)]
    pub start_time: Option<String>,

    /// End time: `<n>[smhd]` ago or ISO-8601
    #[arg(long)]
    pub end_time: Option<String>,

    /// Value for `$instance` in queries
    #[arg(long)]
    pub instance: Option<String>,

    /// Maximum number of entries
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: u32,

    #[arg(long, value_enum, default_value_t = Direction::Backward)]
    pub direction: Direction,

    /// Output file
    #[arg(long, visible_alias = "output-file", default_value = "service_logs.json")]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl LogsArgs {
    /// Flags first, then `[grafana]`.
    fn settings(&self, ctx: &Context) -> Result<GrafanaSettings> {
        let url = match (&self.dashboard_url, &self.grafana_url) {
            (Some(dashboard), _) => base_url_from_dashboard_url(dashboard)?,
            (None, Some(url)) => url.clone(),
            (None, None) => ctx.config.grafana.url.clone().ok_or_else(|| {
                Error::Usage("Either --grafana-url or --dashboard-url must be provided".to_string())
            })?,
        };

        let mut settings = GrafanaSettings::from_config(url, &ctx.config.grafana);
        if self.api_key.is_some() || self.username.is_some() {
            settings.auth = Auth::from_parts(
                self.api_key.clone(),
                self.username.clone(),
                self.password.clone(),
            );
        }
        if let Some(org_id) = self.org_id {
            settings.org_id = org_id;
        }
        if self.no_verify_ssl {
            settings.verify_ssl = false;
        }
        Ok(settings)
    }

    /// Panel for every source except the dashboard, which needs the API.
    fn local_panel(&self) -> Result<Value> {
        if let Some(path) = &self.panel_file {
            let content = std::fs::read_to_string(path)?;
            let panel: Value = serde_json::from_str(&content).map_err(LogsError::from)?;
            tracing::info!(path = %path.display(), "Loaded panel configuration from file");
            return Ok(panel);
        }
        if let Some(json) = &self.panel_json {
            let panel: Value = serde_json::from_str(json).map_err(LogsError::from)?;
            return Ok(panel);
        }
        Ok(service_panel(
            &self.service,
            self.query.as_deref(),
            &self.datasource_uid,
        ))
    }

    fn describe_source(&self) -> String {
        if self.dashboard_url.is_some() {
            "dashboard panel".to_string()
        } else if self.panel_file.is_some() || self.panel_json.is_some() {
            "panel configuration".to_string()
        } else if self.query.is_some() {
            "custom query".to_string()
        } else {
            format!("{} service", self.service)
        }
    }
}

async fn resolve_target(args: &LogsArgs, client: &GrafanaClient) -> Result<PanelTarget> {
    let panel = match &args.dashboard_url {
        Some(url) => {
            let dashboard = client.dashboard_from_url(url).await?;
            let panel = select_logs_panel(&dashboard, args.panel_index)?;
            let title = panel
                .get("title")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("Unnamed panel");
            tracing::info!(title = %title, "Using dashboard panel");
            panel
        }
        None => args.local_panel()?,
    };
    Ok(panel_target(&panel)?)
}

pub async fn run(args: LogsArgs, ctx: &Context) -> Result<()> {
    let client = GrafanaClient::new(args.settings(ctx)?)?;
    if let Err(e) = client.check_connection().await {
        tracing::warn!(error = %e, "Could not connect to Grafana. Proceeding anyway");
    }

    let target = resolve_target(&args, &client).await?;
    let range = TimeRange::resolve(
        args.hours,
        args.start_time.as_deref(),
        args.end_time.as_deref(),
        Utc::now(),
    )?;
    let query = LokiQuery {
        query: prepare_query(&target.query, args.instance.as_deref()),
        start: range.start,
        end: range.end,
        limit: args.limit,
        direction: args.direction,
    };

    println!(
        "Fetching logs from {} for the past {} hour(s)...",
        args.describe_source(),
        args.hours
    );
    let entries = query_range(&client, &target.datasource_uid, &query).await?;
    save_logs(&entries, &args.output, args.format)?;

    println!(
        "Downloaded {} log entries to {}",
        entries.len(),
        args.output.display()
    );
    if !entries.is_empty() {
        println!("\nPreview of logs:");
        for line in preview(&entries, PREVIEW_ENTRIES) {
            println!("{}", line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use crate::config::AppConfig;
    use clap::Parser;

    fn parse(extra: &[&str]) -> LogsArgs {
        let mut argv = vec!["chainops", "logs"];
        argv.extend_from_slice(extra);
        let Command::Logs(args) = Cli::try_parse_from(argv).unwrap().command else {
            panic!("expected logs");
        };
        args
    }

    fn context() -> Context {
        Context {
            config: AppConfig::default(),
        }
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.hours, 1);
        assert_eq!(args.limit, DEFAULT_LIMIT);
        assert_eq!(args.direction, Direction::Backward);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.output, PathBuf::from("service_logs.json"));
    }

    #[test]
    fn test_url_required() {
        let err = parse(&[]).settings(&context()).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn test_dashboard_url_supplies_base() {
        let args = parse(&[
            "--dashboard-url",
            "http://grafana.local:3000/d/abc123/node-logs?orgId=1",
            "--org-id",
            "4",
            "--no-verify-ssl",
        ]);
        let settings = args.settings(&context()).unwrap();
        assert_eq!(settings.url, "http://grafana.local:3000");
        assert_eq!(settings.org_id, 4);
        assert!(!settings.verify_ssl);
    }

    #[test]
    fn test_flag_credentials_override_config() {
        let mut ctx = context();
        ctx.config.grafana.url = Some("http://grafana.local".into());
        ctx.config.grafana.api_key = Some("from-config".into());

        let args = parse(&["--username", "admin", "--password", "secret"]);
        let settings = args.settings(&ctx).unwrap();
        assert_eq!(
            settings.auth,
            Auth::Basic {
                username: "admin".into(),
                password: "secret".into()
            }
        );
    }

    #[test]
    fn test_service_panel_is_the_fallback() {
        let target = panel_target(&parse(&["--service", "consensus"]).local_panel().unwrap()).unwrap();
        assert_eq!(target.query, "{container_name=\"consensus\"}");
        assert_eq!(target.datasource_uid, DEFAULT_DATASOURCE_UID);

        let target = panel_target(
            &parse(&["--query", "{job=\"geth\"} |= `error`"])
                .local_panel()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(target.query, "{job=\"geth\"} |= `error`");
    }

    #[test]
    fn test_panel_json_wins_over_query() {
        let panel = r#"{"datasource":{"uid":"loki_x"},"targets":[{"expr":"{app=\"a\"}"}]}"#;
        let args = parse(&["--panel-json", panel, "--query", "{app=\"b\"}"]);
        let target = panel_target(&args.local_panel().unwrap()).unwrap();
        assert_eq!(target.datasource_uid, "loki_x");
        assert_eq!(target.query, "{app=\"a\"}");
    }

    #[tokio::test]
    async fn test_dashboard_panel_resolved() {
        use wiremock::matchers::path;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(path("/api/dashboards/uid/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "dashboard": {
                    "panels": [{
                        "type": "logs",
                        "title": "Execution",
                        "datasource": {"type": "loki", "uid": "loki_nodes"},
                        "targets": [{"expr": "{container_name=\"execution\"}"}]
                    }]
                }
            })))
            .mount(&server)
            .await;

        let dashboard_url = format!("{}/d/nodes/node-overview", server.uri());
        let args = parse(&["--dashboard-url", &dashboard_url]);
        let client = GrafanaClient::new(args.settings(&context()).unwrap()).unwrap();
        let target = resolve_target(&args, &client).await.unwrap();
        assert_eq!(target.datasource_uid, "loki_nodes");
        assert_eq!(target.query, "{container_name=\"execution\"}");
    }

    #[test]
    fn test_panel_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.json");
        std::fs::write(
            &path,
            r#"{"targets":[{"datasource":{"uid":"loki_f"},"query":"{app=\"f\"}"}]}"#,
        )
        .unwrap();
        let args = parse(&["--panel-file", path.to_str().unwrap()]);
        let target = panel_target(&args.local_panel().unwrap()).unwrap();
        assert_eq!(target.datasource_uid, "loki_f");
    }
}
