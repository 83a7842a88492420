//! Email alerts over SMTP with STARTTLS.

use super::settle;
use crate::core::{Delivery, Notice, Sink};
use crate::error::SinkError;
use crate::resolver::{resolve, ConfigProvider, Resolved, SinkSettings};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::sync::Arc;
use tracing::{info, instrument};

/// The `email` section.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EmailSettings {
    pub smtp_server: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub smtp_port: u16,
    /// Sender address, also the SMTP login.
    pub from_address: String,
    pub from_password: String,
    pub to_address: String,
}

impl SinkSettings for EmailSettings {
    const SECTION: &'static str = "email";
    const REQUIRED: &'static [&'static str] =
        &["smtp_server", "smtp_port", "from_address", "from_password", "to_address"];
}

/// Sends one plain-text message per call to the configured recipient.
pub struct EmailSink {
    config: Arc<dyn ConfigProvider>,
}

impl EmailSink {
    pub const NAME: &'static str = "email";

    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }

    /// Sends the message. Every failure, from address parsing to the SMTP
    /// exchange, is reported as `SinkError::Email` without its cause.
    #[instrument(skip(self, body))]
    pub async fn try_send(&self, subject: &str, body: &str) -> Result<Delivery, SinkError> {
        let settings = match resolve::<EmailSettings>(self.config.as_ref()) {
            Resolved::Enabled(settings) => settings,
            Resolved::Disabled(reason) => return Ok(Delivery::Disabled(reason)),
        };

        transmit(&settings, subject, body)
            .await
            .map_err(|_| SinkError::Email)?;

        info!("Email Sent.");
        Ok(Delivery::Delivered)
    }

    pub async fn send(&self, subject: &str, body: &str) {
        settle(Self::NAME, self.try_send(subject, body).await);
    }
}

async fn transmit(settings: &EmailSettings, subject: &str, body: &str) -> anyhow::Result<()> {
    let message = Message::builder()
        .from(settings.from_address.parse()?)
        .to(settings.to_address.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?;

    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_server)?
        .port(settings.smtp_port)
        .credentials(Credentials::new(
            settings.from_address.clone(),
            settings.from_password.clone(),
        ))
        .build();

    transport.send(message).await?;
    Ok(())
}

#[async_trait]
impl Sink for EmailSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_send(&notice.subject, &notice.body).await
    }
}
