//! Core domain types and the sink contract.
//!
//! This module defines the finding record produced by upstream plugins, the
//! notice handed to the dispatcher, and the trait every downstream
//! integration implements.

use crate::error::{ConfigError, SinkError};
use crate::formatting::{PlainTextFormatter, TextFormatter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A result discovered by a plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Finding {
    pub title: String,
    /// Name of the plugin that produced the result.
    pub plugin_name: String,
    pub domain: String,
    /// Unique key used for deduplication in the result stores.
    pub link: String,
    pub result_type: String,
    /// Path of the raw output the plugin saved for this result.
    pub output_file: String,
    /// Identifier of the task that ran the plugin.
    pub task_id: i64,
}

/// A finding together with the texts the sinks deliver for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub finding: Finding,
    /// Ticket summary and email subject.
    pub subject: String,
    /// Ticket description and email body.
    pub body: String,
    /// One-line chat message.
    pub message: String,
    /// Document id for the search index. Distinct from `finding.link`.
    pub index_key: String,
}

impl Notice {
    /// Builds a notice using the default plain-text formatter.
    pub fn new(finding: Finding) -> Self {
        Self::with_formatter(finding, &PlainTextFormatter)
    }

    pub fn with_formatter(finding: Finding, formatter: &dyn TextFormatter) -> Self {
        Self {
            subject: formatter.subject(&finding),
            body: formatter.body(&finding),
            message: formatter.message(&finding),
            index_key: formatter.index_key(&finding),
            finding,
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn index_key(mut self, index_key: impl Into<String>) -> Self {
        self.index_key = index_key.into();
        self
    }
}

/// What a sink did with a notice when it did not fail.
#[derive(Debug)]
pub enum Delivery {
    Delivered,
    /// The record already exists downstream; nothing was written.
    Duplicate,
    /// The sink is not configured for this delivery.
    Disabled(ConfigError),
}

/// The settled result of one sink delivery, as reported by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutcome {
    Delivered,
    Duplicate,
    Disabled(String),
    Failed(String),
}

impl SinkOutcome {
    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SinkOutcome::Delivered => "delivered",
            SinkOutcome::Duplicate => "duplicate",
            SinkOutcome::Disabled(_) => "disabled",
            SinkOutcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkOutcome::Delivered => write!(f, "delivered"),
            SinkOutcome::Duplicate => write!(f, "duplicate, skipped"),
            SinkOutcome::Disabled(reason) => write!(f, "disabled ({})", reason),
            SinkOutcome::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// A downstream integration that findings are fanned out to.
#[async_trait]
pub trait Sink: Send + Sync {
    /// A unique, descriptive name for the sink (e.g., "slack", "jira").
    /// Used for logging and metrics.
    fn name(&self) -> &'static str;

    /// Delivers a notice to the downstream system.
    ///
    /// # Returns
    /// * `Ok(Delivery)` describing what happened, including the disabled case
    /// * `Err` if the downstream call failed
    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError>;
}
