//! A client for creating tickets in RTIR through the RT REST 1.0 interface.

use super::settle;
use crate::core::{Delivery, Notice, Sink};
use crate::error::SinkError;
use crate::http::ensure_success;
use crate::resolver::{resolve, ConfigProvider, Resolved, SinkSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::sync::Arc;
use tracing::{info, instrument};

/// The `rtir` section.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RtirSettings {
    /// URL scheme, "http" or "https".
    pub service: String,
    pub host: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub authenticator: Option<String>,
}

impl SinkSettings for RtirSettings {
    const SECTION: &'static str = "rtir";
    const REQUIRED: &'static [&'static str] = &["service", "host", "port", "user", "password"];
}

/// How requests authenticate against RT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtirAuthenticator {
    /// Credentials travel as `user`/`pass` query parameters and RT answers
    /// with a session cookie.
    CookieBased,
}

impl RtirAuthenticator {
    /// Unknown or absent modes fall back to cookie-based authentication.
    pub fn from_setting(value: Option<&str>) -> Self {
        if value != Some("cookie_based") {
            info!("No Authenticator specified, using the default which is cookie-based authentication.");
        }
        RtirAuthenticator::CookieBased
    }
}

/// Creates one RTIR ticket per call in queue 1.
pub struct RtirSink {
    config: Arc<dyn ConfigProvider>,
    client: Client,
}

impl RtirSink {
    pub const NAME: &'static str = "rtir";

    pub fn new(config: Arc<dyn ConfigProvider>, client: Client) -> Self {
        Self { config, client }
    }

    #[instrument(skip(self, body))]
    pub async fn try_create_ticket(&self, subject: &str, body: &str) -> Result<Delivery, SinkError> {
        let settings = match resolve::<RtirSettings>(self.config.as_ref()) {
            Resolved::Enabled(settings) => settings,
            Resolved::Disabled(reason) => return Ok(Delivery::Disabled(reason)),
        };

        let url = format!(
            "{}://{}:{}/REST/1.0/ticket/new",
            settings.service, settings.host, settings.port
        );
        let content = ticket_content(subject, body);

        let request = match RtirAuthenticator::from_setting(settings.authenticator.as_deref()) {
            RtirAuthenticator::CookieBased => self
                .client
                .post(&url)
                .query(&[("user", &settings.user), ("pass", &settings.password)]),
        };
        let response = request.form(&[("content", content)]).send().await?;
        let response = ensure_success("RTIR", response).await?;

        // RT answers 200 at the HTTP level and reports its own status in the
        // first line of the body, e.g. "RT/4.4.4 401 Credentials required".
        let text = response.text().await?;
        if let Some(status_line) = rt_error_status(&text) {
            return Err(SinkError::Rejected {
                service: "RTIR",
                reason: status_line.to_string(),
            });
        }

        info!("RTIR ticket created.");
        Ok(Delivery::Delivered)
    }

    pub async fn create_ticket(&self, subject: &str, body: &str) {
        settle(Self::NAME, self.try_create_ticket(subject, body).await);
    }
}

#[async_trait]
impl Sink for RtirSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_create_ticket(&notice.subject, &notice.body).await
    }
}

/// The RT ticket text sent as the `content` form field.
pub fn ticket_content(subject: &str, body: &str) -> String {
    format!(
        "id: ticket/new\nQueue: 1\nSubject: {}\nText: {}",
        subject, body
    )
}

/// Returns the status line when the body is an RT reply with a non-200 code.
fn rt_error_status(body: &str) -> Option<&str> {
    let line = body.lines().next()?.trim();
    if !line.starts_with("RT/") {
        return None;
    }
    match line.split_whitespace().nth(1) {
        Some("200") => None,
        _ => Some(line),
    }
}
