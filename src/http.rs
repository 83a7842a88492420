//! Shared plumbing for the HTTP-based sinks.

use crate::config::HttpSettings;
use crate::error::SinkError;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Builds the client shared by the HTTP sinks.
pub fn build_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();
    if let Some(seconds) = settings.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds));
    }
    builder.build()
}

/// Turns a non-success response into a `SinkError::Status`.
pub async fn ensure_success(service: &'static str, response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(service, status = %status, body = %body, "Downstream request failed");
    Err(SinkError::Status {
        service,
        status,
        body,
    })
}
