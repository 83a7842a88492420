//! Indexes findings as JSON documents in Elasticsearch.

use super::settle;
use crate::core::{Delivery, Finding, Notice, Sink};
use crate::error::SinkError;
use crate::formatting::format_timestamp;
use crate::resolver::{resolve, ConfigProvider, Resolved, SinkSettings};
use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::sync::Arc;
use tracing::{info, instrument};

fn default_index() -> String {
    "scrummage".to_string()
}

/// The `elasticsearch` section.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ElasticsearchSettings {
    /// URL scheme prefix including the separator, e.g. "http://".
    pub service: String,
    pub host: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub port: u16,
    #[serde(default = "default_index")]
    pub index: String,
}

impl SinkSettings for ElasticsearchSettings {
    const SECTION: &'static str = "elasticsearch";
    const REQUIRED: &'static [&'static str] = &["service", "host", "port"];
}

impl ElasticsearchSettings {
    pub fn document_url(&self, key: &str) -> String {
        format!(
            "{}{}:{}/{}/result/{}",
            self.service, self.host, self.port, self.index, key
        )
    }
}

/// The indexed document.
#[derive(Debug, Serialize)]
pub struct IndexDocument<'a> {
    pub title: &'a str,
    pub plugin: &'a str,
    pub domain: &'a str,
    pub link: &'a str,
    pub output_file: &'a str,
    pub result_type: &'a str,
    pub created_at: String,
    pub associated_task_id: String,
}

impl<'a> IndexDocument<'a> {
    pub fn new(finding: &'a Finding) -> Self {
        Self {
            title: &finding.title,
            plugin: &finding.plugin_name,
            domain: &finding.domain,
            link: &finding.link,
            output_file: &finding.output_file,
            result_type: &finding.result_type,
            created_at: format_timestamp(Local::now()),
            associated_task_id: finding.task_id.to_string(),
        }
    }
}

pub struct ElasticsearchSink {
    config: Arc<dyn ConfigProvider>,
    client: Client,
}

impl ElasticsearchSink {
    pub const NAME: &'static str = "elasticsearch";

    pub fn new(config: Arc<dyn ConfigProvider>, client: Client) -> Self {
        Self { config, client }
    }

    /// Posts the finding under `composite_key`.
    ///
    /// The key is chosen by the caller and is independent of the finding's
    /// link, so one finding can be indexed under several keys.
    #[instrument(skip(self, finding))]
    pub async fn try_index(&self, finding: &Finding, composite_key: &str) -> Result<Delivery, SinkError> {
        let settings = match resolve::<ElasticsearchSettings>(self.config.as_ref()) {
            Resolved::Enabled(settings) => settings,
            Resolved::Disabled(reason) => return Ok(Delivery::Disabled(reason)),
        };

        let url = settings.document_url(composite_key);
        let response = self
            .client
            .post(&url)
            .json(&IndexDocument::new(finding))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            info!(%url, %status, "Failed to create result in Elasticsearch.");
            return Err(SinkError::Status {
                service: "Elasticsearch",
                status,
                body,
            });
        }

        info!(%url, "Result created in Elasticsearch.");
        Ok(Delivery::Delivered)
    }

    pub async fn index(&self, finding: &Finding, composite_key: &str) {
        settle(Self::NAME, self.try_index(finding, composite_key).await);
    }
}

#[async_trait]
impl Sink for ElasticsearchSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_index(&notice.finding, &notice.index_key).await
    }
}
