//! `chainops report notify|results`

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::cli::Context;
use crate::error::Result;
use crate::report::{
    send_results, MessageParts, ReportError, ResultsRequest, SlackWebhook, Verdict,
    DEFAULT_DESCRIPTION, REPORTS_DIR,
};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Post a message built from the given fields
    Notify(NotifyArgs),

    /// Post the result of a pytest run from its JSON report
    Results(ResultsArgs),
}

#[derive(Debug, Args)]
pub struct WebhookArgs {
    /// Slack incoming webhook, overrides `slack.webhook_url`
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,
}

impl WebhookArgs {
    fn webhook(&self, ctx: &Context) -> Result<SlackWebhook> {
        let url = self
            .webhook_url
            .clone()
            .or_else(|| ctx.config.slack.webhook_url.clone())
            .ok_or(ReportError::MissingWebhook)?;
        Ok(SlackWebhook::new(url, WEBHOOK_TIMEOUT)?)
    }
}

#[derive(Debug, Args)]
pub struct NotifyArgs {
    #[command(flatten)]
    pub webhook: WebhookArgs,

    #[arg(long, value_enum, default_value_t = Verdict::Pass)]
    pub verdict: Verdict,

    /// Message text above the attachment
    #[arg(long)]
    pub text: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub version: Option<String>,

    /// Artifacts link
    #[arg(long)]
    pub report_link: Option<String>,

    #[arg(long)]
    pub pipeline_link: Option<String>,

    #[arg(long)]
    pub summary: Option<String>,

    /// Shown as `Tests started at:` in the footer
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Footer line above the timestamp
    #[arg(long)]
    pub additional_info: Option<String>,
}

#[derive(Debug, Args)]
pub struct ResultsArgs {
    #[command(flatten)]
    pub webhook: WebhookArgs,

    #[arg(long, default_value = DEFAULT_DESCRIPTION)]
    pub description: String,

    /// Summary text; read from the report when missing
    #[arg(long)]
    pub summary: Option<String>,

    /// Run start time; now when missing
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Verdict when the report is not read
    #[arg(long, value_enum, default_value_t = Verdict::Pass)]
    pub verdict: Verdict,

    /// Post passing runs too
    #[arg(long)]
    pub always_post: bool,

    /// CI job URL for the pipeline and artifacts links
    #[arg(long, env = "CI_JOB_URL")]
    pub job_url: Option<String>,

    /// Report file name without `.json`
    #[arg(long, default_value = "report")]
    pub report_name: String,

    #[arg(long, default_value = REPORTS_DIR)]
    pub reports_dir: PathBuf,
}

impl NotifyArgs {
    fn parts(&self) -> MessageParts {
        MessageParts {
            text: self.text.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            report_link: self.report_link.clone(),
            pipeline_link: self.pipeline_link.clone(),
            summary: self.summary.clone(),
            timestamp: self.timestamp.clone(),
            additional_info: self.additional_info.clone(),
        }
    }
}

impl From<ResultsArgs> for ResultsRequest {
    fn from(args: ResultsArgs) -> Self {
        Self {
            description: args.description,
            summary: args.summary,
            timestamp: args.timestamp,
            verdict: args.verdict,
            always_post: args.always_post,
            job_url: args.job_url,
            report_name: args.report_name,
            reports_dir: args.reports_dir,
        }
    }
}

pub async fn run(cmd: ReportCommand, ctx: &Context) -> Result<()> {
    match cmd {
        ReportCommand::Notify(args) => {
            let webhook = args.webhook.webhook(ctx)?;
            webhook.post(&args.parts().build(args.verdict)).await?;
            println!("Notification sent");
        }
        ReportCommand::Results(args) => {
            let webhook = args.webhook.webhook(ctx)?;
            let request = ResultsRequest::from(args);
            let outcome = send_results(&webhook, &request).await?;
            let verdict = match outcome.verdict {
                Verdict::Pass => "pass",
                Verdict::Fail => "fail",
            };
            if outcome.posted {
                println!("Report sent to Slack (verdict: {})", verdict);
            } else {
                println!("Report not sent (verdict: {}, use --always-post to send)", verdict);
            }
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

    #[test]
    fn test_results_defaults() {
        let cli = Cli::try_parse_from(["chainops", "report", "results"]).unwrap();
        let Command::Report(ReportCommand::Results(args)) = cli.command else {
            panic!("expected report results");
        };
        let request: ResultsRequest = args.into();
        assert_eq!(request.description, DEFAULT_DESCRIPTION);
        assert_eq!(request.report_name, "report");
        assert_eq!(request.reports_dir, PathBuf::from(REPORTS_DIR));
        assert_eq!(request.verdict, Verdict::Pass);
        assert!(!request.always_post);
    }

    #[test]
    fn test_notify_parts() {
        let cli = Cli::try_parse_from([
            "chainops",
            "report",
            "notify",
            "--verdict",
            "fail",
            "--version",
            "1.2.3",
            "--summary",
            "3 failed",
        ])
        .unwrap();
        let Command::Report(ReportCommand::Notify(args)) = cli.command else {
            panic!("expected report notify");
        };
        let message = args.parts().build(args.verdict);
        assert_eq!(message.attachments[0].color, "warning");
        assert_eq!(message.attachments[0].fields.len(), 2);
        assert!(message.text.is_none());
    }

    #[test]
    fn test_webhook_from_config() {
        let mut config = AppConfig::default();
        let ctx = Context {
            config: config.clone(),
        };
        let args = WebhookArgs { webhook_url: None };
        assert!(args.webhook(&ctx).is_err());

        config.slack.webhook_url = Some("https://hooks.slack.com/services/T/B/X".into());
        let ctx = Context { config };
        assert!(args.webhook(&ctx).is_ok());
    }
}
