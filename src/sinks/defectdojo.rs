//! Creates findings in DefectDojo through its v1 REST API.

use super::settle;
use crate::core::{Delivery, Notice, Sink};
use crate::error::SinkError;
use crate::http::ensure_success;
use crate::resolver::{resolve, ConfigProvider, Resolved, SinkSettings};
use async_trait::async_trait;
use chrono::Local;
use reqwest::header::LOCATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::sync::Arc;
use tracing::{info, instrument};

const IMPACT: &str = "All Scrummage findings have the potential to cause significant damage to a business' finances, efficiency and reputation. Therefore, findings should be investigated to assist in reducing this risk.";
const MITIGATION: &str = "It is recommended that this issue be investigated further by the security team to determine whether or not further action needs to be taken.";

/// The `defectdojo` section.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DefectDojoSettings {
    pub api_key: String,
    /// Base URL of the DefectDojo instance.
    pub host: String,
    pub user: String,
    #[serde(rename = "engagement-id")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub engagement_id: u64,
    #[serde(rename = "product-id")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub product_id: u64,
    #[serde(rename = "test-id")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub test_id: u64,
    #[serde(rename = "user-id")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub user_id: u64,
}

impl SinkSettings for DefectDojoSettings {
    const SECTION: &'static str = "defectdojo";
    const REQUIRED: &'static [&'static str] = &[
        "api_key",
        "host",
        "user",
        "engagement-id",
        "product-id",
        "test-id",
        "user-id",
    ];
}

/// The finding payload posted to DefectDojo.
///
/// The v1 API references related objects by resource URI, e.g.
/// `/api/v1/products/1/`, not by bare id.
#[derive(Debug, Serialize)]
pub struct NewFinding<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub severity: &'static str,
    pub cwe: &'static str,
    pub date: String,
    pub product: String,
    pub engagement: String,
    pub test: String,
    pub reporter: String,
    pub impact: &'static str,
    pub mitigation: &'static str,
    pub active: bool,
    pub verified: bool,
}

impl<'a> NewFinding<'a> {
    pub fn new(settings: &DefectDojoSettings, title: &'a str, description: &'a str) -> Self {
        Self {
            title,
            description,
            severity: "Low",
            cwe: "",
            date: Local::now().format("%Y-%m-%d").to_string(),
            product: resource_uri("products", settings.product_id),
            engagement: resource_uri("engagements", settings.engagement_id),
            test: resource_uri("tests", settings.test_id),
            reporter: resource_uri("users", settings.user_id),
            impact: IMPACT,
            mitigation: MITIGATION,
            active: true,
            verified: false,
        }
    }
}

fn resource_uri(collection: &str, id: u64) -> String {
    format!("/api/v1/{}/{}/", collection, id)
}

#[derive(Debug, Deserialize)]
struct CreatedFinding {
    id: u64,
}

pub struct DefectDojoSink {
    config: Arc<dyn ConfigProvider>,
    client: Client,
}

impl DefectDojoSink {
    pub const NAME: &'static str = "defectdojo";

    pub fn new(config: Arc<dyn ConfigProvider>, client: Client) -> Self {
        Self { config, client }
    }

    #[instrument(skip(self, description))]
    pub async fn try_create_finding(&self, title: &str, description: &str) -> Result<Delivery, SinkError> {
        let settings = match resolve::<DefectDojoSettings>(self.config.as_ref()) {
            Resolved::Enabled(settings) => settings,
            Resolved::Disabled(reason) => return Ok(Delivery::Disabled(reason)),
        };

        let url = format!("{}/api/v1/findings/", settings.host.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("ApiKey {}:{}", settings.user, settings.api_key),
            )
            .json(&NewFinding::new(&settings, title, description))
            .send()
            .await?;
        let response = ensure_success("DefectDojo", response).await?;

        let from_location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(id_from_location);
        let finding_id = match from_location {
            Some(id) => Some(id),
            None => response.json::<CreatedFinding>().await.ok().map(|f| f.id),
        };

        match finding_id {
            Some(id) => info!(id, "DefectDojo finding created."),
            None => info!("DefectDojo accepted the finding but returned no id."),
        }
        Ok(Delivery::Delivered)
    }

    pub async fn create_finding(&self, title: &str, description: &str) {
        settle(Self::NAME, self.try_create_finding(title, description).await);
    }
}

#[async_trait]
impl Sink for DefectDojoSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_create_finding(&notice.finding.title, &notice.body).await
    }
}

/// Extracts the id from a resource URI such as `/api/v1/findings/17/`.
fn id_from_location(location: &str) -> Option<u64> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}
