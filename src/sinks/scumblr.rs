//! The secondary aggregator store (Scumblr).
//!
//! Same insert-once contract as the primary store, against a schema without
//! status or plugin columns. The two stores are resolved and connected
//! independently, so one failing has no bearing on the other.

use super::settle;
use super::store::{record_once, DatabaseSettings, PgConnector, ResultSchema, StoreConnector};
use crate::core::{Delivery, Finding, Notice, Sink};
use crate::error::SinkError;
use crate::resolver::{resolve, ConfigProvider, Resolved, SinkSettings};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// The `scumblr` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ScumblrDatabase(pub DatabaseSettings);

impl SinkSettings for ScumblrDatabase {
    const SECTION: &'static str = "scumblr";
    const REQUIRED: &'static [&'static str] = &["host", "port", "database", "user", "password"];
}

pub struct ScumblrSink {
    config: Arc<dyn ConfigProvider>,
    connector: Arc<dyn StoreConnector>,
}

impl ScumblrSink {
    pub const NAME: &'static str = "scumblr";

    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self::with_connector(config, Arc::new(PgConnector))
    }

    pub fn with_connector(config: Arc<dyn ConfigProvider>, connector: Arc<dyn StoreConnector>) -> Self {
        Self { config, connector }
    }

    #[instrument(skip_all, fields(link = %finding.link))]
    pub async fn try_record(&self, finding: &Finding) -> Result<Delivery, SinkError> {
        let target = match resolve::<ScumblrDatabase>(self.config.as_ref()) {
            Resolved::Enabled(ScumblrDatabase(target)) => target,
            Resolved::Disabled(reason) => return Ok(Delivery::Disabled(reason)),
        };
        record_once(self.connector.as_ref(), &target, ResultSchema::Scumblr, finding).await
    }

    pub async fn record(&self, finding: &Finding) {
        settle(Self::NAME, self.try_record(finding).await);
    }
}

#[async_trait]
impl Sink for ScumblrSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_record(&notice.finding).await
    }
}
