//! A client for posting notifications through the Slack Web API.

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

const DEFAULT_API_URL: &str = "https://slack.com/api";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// The `slack` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SlackSettings {
    /// Bot or user OAuth token.
    pub token: String,
    /// Channel name or id to post to.
    pub channel: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl SinkSettings for SlackSettings {
    const SECTION: &'static str = "slack";
    const REQUIRED: &'static [&'static str] = &["token", "channel"];
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackSink {
    config: Arc<dyn ConfigProvider>,
    client: Client,
}

impl SlackSink {
    pub const NAME: &'static str = "slack";

    pub fn new(config: Arc<dyn ConfigProvider>, client: Client) -> Self {
        Self { config, client }
    }

    /// Posts `message` to the configured channel.
    ///
    /// Slack reports most failures with HTTP 200 and `"ok": false`; those
    /// are returned as `SinkError::Rejected`.
    #[instrument(skip_all)]
    pub async fn try_notify(&self, message: &str) -> Result<Delivery, SinkError> {
        let settings = match resolve::<SlackSettings>(self.config.as_ref()) {
            Resolved::Enabled(settings) => settings,
            Resolved::Disabled(reason) => return Ok(Delivery::Disabled(reason)),
        };

        let url = format!("{}/chat.postMessage", settings.api_url.trim_end_matches('/'));
        let payload = json!({ "channel": settings.channel, "text": message });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&settings.token)
            .json(&payload)
            .send()
            .await?;
        let reply: PostMessageResponse = ensure_success("Slack", response).await?.json().await?;

        if !reply.ok {
            return Err(SinkError::Rejected {
                service: "Slack",
                reason: reply.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        info!(channel = %settings.channel, "Slack Notification created.");
        Ok(Delivery::Delivered)
    }

    pub async fn notify(&self, message: &str) {
        settle(Self::NAME, self.try_notify(message).await);
    }
}

#[async_trait]
impl Sink for SlackSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_notify(&notice.message).await
    }
}
