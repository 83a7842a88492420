//! Error types shared by the configuration resolver and the sinks.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a sink section could not be turned into an enabled configuration.
///
/// None of these are fatal: a sink that resolves to one of them is simply
/// skipped for the current delivery.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("failed to load sink configuration: {0}")]
    Load(String),
    #[error("section `{0}` is missing")]
    MissingSection(String),
    #[error("section `{section}` is missing required fields: {}", fields.join(", "))]
    Incomplete {
        section: String,
        fields: Vec<String>,
    },
    #[error("section `{section}` is malformed: {reason}")]
    Malformed { section: String, reason: String },
}

/// A failed delivery to one downstream system.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("{service} rejected the request: {reason}")]
    Rejected {
        service: &'static str,
        reason: String,
    },
    /// Carries no cause.
    #[error("Failed to send alert! Check email login settings.")]
    Email,
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
