//! Slack incoming-webhook payloads.

use std::time::Duration;

use serde::Serialize;

use crate::report::{ReportError, ReportResult, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub title: &'static str,
    pub value: String,
    pub short: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub color: &'static str,
    pub fields: Vec<Field>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Everything a notification can carry. Empty values are left out.
#[derive(Debug, Clone, Default)]
pub struct MessageParts {
    pub text: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub report_link: Option<String>,
    pub pipeline_link: Option<String>,
    pub summary: Option<String>,
    pub timestamp: Option<String>,
    pub additional_info: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl MessageParts {
    fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if let Some(description) = present(&self.description) {
            fields.push(Field {
                title: "Description",
                value: description.to_string(),
                short: false,
            });
        }
        if let Some(version) = present(&self.version) {
            fields.push(Field {
                title: "version",
                value: format!("`{}`", version),
                short: true,
            });
        }
        if let Some(link) = present(&self.report_link) {
            fields.push(Field {
                title: "artifacts",
                value: format!("(<{} | download>)", link),
                short: true,
            });
        }
        if let Some(link) = present(&self.pipeline_link) {
            fields.push(Field {
                title: "pipeline",
                value: format!("(<{} | open>)", link),
                short: true,
            });
        }
        if let Some(summary) = present(&self.summary) {
            fields.push(Field {
                title: "summary",
                value: summary.to_string(),
                short: false,
            });
        }
        fields
    }

    fn footer(&self) -> Option<String> {
        let mut footer = present(&self.additional_info)
            .map(|info| format!("{}\n", info))
            .unwrap_or_default();
        if let Some(ts) = present(&self.timestamp) {
            footer.push_str(&format!("Tests started at: {}", ts));
        }
        (!footer.is_empty()).then_some(footer)
    }

    pub fn build(&self, verdict: Verdict) -> SlackMessage {
        SlackMessage {
            text: present(&self.text).map(str::to_string),
            attachments: vec![Attachment {
                color: verdict.color(),
                fields: self.fields(),
                footer: self.footer(),
            }],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlackWebhook {
    http: reqwest::Client,
    url: String,
}

impl SlackWebhook {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ReportResult<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(ReportError::MissingWebhook);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ReportError::Http)?;
        Ok(Self { http, url })
    }

    pub async fn post(&self, message: &SlackMessage) -> ReportResult<()> {
        tracing::debug!(attachments = message.attachments.len(), "Posting Slack message");
        let response = self
            .http
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(ReportError::Http)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!("Slack notification sent");
        Ok(())
    }
}
