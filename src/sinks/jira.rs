//! A client for opening JIRA issues through the REST API.

use super::settle;
use crate::core::{Delivery, Notice, Sink};
use crate::error::SinkError;
use crate::http::ensure_success;
use crate::resolver::{resolve, ConfigProvider, Resolved, SinkSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// The `JIRA` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JiraSettings {
    pub project_key: String,
    /// Base URL of the JIRA server.
    pub address: String,
    pub username: String,
    pub password: String,
    /// Issue type name, e.g. "Task" or "Bug".
    pub ticket_type: String,
}

impl SinkSettings for JiraSettings {
    const SECTION: &'static str = "JIRA";
    const REQUIRED: &'static [&'static str] =
        &["project_key", "address", "username", "password", "ticket_type"];
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

/// Creates one JIRA issue per call. There is no deduplication.
pub struct JiraSink {
    config: Arc<dyn ConfigProvider>,
    client: Client,
}

impl JiraSink {
    pub const NAME: &'static str = "jira";

    pub fn new(config: Arc<dyn ConfigProvider>, client: Client) -> Self {
        Self { config, client }
    }

    #[instrument(skip(self, body))]
    pub async fn try_create_ticket(&self, subject: &str, body: &str) -> Result<Delivery, SinkError> {
        let settings = match resolve::<JiraSettings>(self.config.as_ref()) {
            Resolved::Enabled(settings) => settings,
            Resolved::Disabled(reason) => return Ok(Delivery::Disabled(reason)),
        };

        let url = format!("{}/rest/api/2/issue", settings.address.trim_end_matches('/'));
        let payload = json!({
            "fields": {
                "project": { "key": settings.project_key },
                "summary": subject,
                "description": body,
                "issuetype": { "name": settings.ticket_type },
            }
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&settings.username, Some(&settings.password))
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success("JIRA", response).await?;

        match response.json::<CreatedIssue>().await {
            Ok(issue) => info!(key = %issue.key, "JIRA ticket created."),
            Err(_) => info!("JIRA ticket created."),
        }
        Ok(Delivery::Delivered)
    }

    pub async fn create_ticket(&self, subject: &str, body: &str) {
        settle(Self::NAME, self.try_create_ticket(subject, body).await);
    }
}

#[async_trait]
impl Sink for JiraSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_create_ticket(&notice.subject, &notice.body).await
    }
}
