//! The primary result store: Scrummage's own PostgreSQL database.

use super::settle;
use super::store::{record_once, DatabaseSettings, PgConnector, ResultSchema, StoreConnector};
use crate::core::{Delivery, Finding, Notice, Sink};
use crate::error::SinkError;
use crate::resolver::{resolve, ConfigProvider, Resolved, SinkSettings};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// The `postgresql` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PrimaryDatabase(pub DatabaseSettings);

impl SinkSettings for PrimaryDatabase {
    const SECTION: &'static str = "postgresql";
    const REQUIRED: &'static [&'static str] = &["host", "port", "user", "password", "database"];
}

/// Records findings once per link, with status "Open".
pub struct PrimaryStoreSink {
    config: Arc<dyn ConfigProvider>,
    connector: Arc<dyn StoreConnector>,
}

impl PrimaryStoreSink {
    pub const NAME: &'static str = "postgresql";

    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self::with_connector(config, Arc::new(PgConnector))
    }

    pub fn with_connector(config: Arc<dyn ConfigProvider>, connector: Arc<dyn StoreConnector>) -> Self {
        Self { config, connector }
    }

    #[instrument(skip_all, fields(link = %finding.link))]
    pub async fn try_record(&self, finding: &Finding) -> Result<Delivery, SinkError> {
        let target = match resolve::<PrimaryDatabase>(self.config.as_ref()) {
            Resolved::Enabled(PrimaryDatabase(target)) => target,
            Resolved::Disabled(reason) => return Ok(Delivery::Disabled(reason)),
        };
        record_once(self.connector.as_ref(), &target, ResultSchema::Scrummage, finding).await
    }

    /// Records the finding, logging rather than returning any failure.
    pub async fn record(&self, finding: &Finding) {
        settle(Self::NAME, self.try_record(finding).await);
    }
}

#[async_trait]
impl Sink for PrimaryStoreSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_record(&notice.finding).await
    }
}
