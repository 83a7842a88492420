//! Downstream integrations findings are fanned out to.
//!
//! Each sink exposes a `try_*` operation returning `Result<Delivery, SinkError>`
//! and a quiet counterpart that settles the result into the log and returns
//! nothing. The dispatcher goes through [`settle`] as well, so a failing sink
//! never surfaces as an error to the caller.

pub mod csv_export;
pub mod defectdojo;
pub mod elasticsearch;
pub mod email;
pub mod jira;
pub mod primary;
pub mod rtir;
pub mod scumblr;
pub mod slack;
pub mod store;

pub use csv_export::CsvExportSink;
pub use defectdojo::DefectDojoSink;
pub use elasticsearch::ElasticsearchSink;
pub use email::EmailSink;
pub use jira::JiraSink;
pub use primary::PrimaryStoreSink;
pub use rtir::RtirSink;
pub use scumblr::ScumblrSink;
pub use slack::SlackSink;

use crate::core::{Delivery, SinkOutcome};
use crate::error::SinkError;
use tracing::{debug, info, warn};

/// Converts a delivery result into a log line, a metric and an outcome.
pub fn settle(sink: &'static str, result: Result<Delivery, SinkError>) -> SinkOutcome {
    let outcome = match result {
        Ok(Delivery::Delivered) => {
            info!(sink, "Result delivered.");
            SinkOutcome::Delivered
        }
        Ok(Delivery::Duplicate) => {
            info!(sink, "Entry already exists. Skipping...");
            SinkOutcome::Duplicate
        }
        Ok(Delivery::Disabled(reason)) => {
            debug!(sink, %reason, "Sink disabled, skipping.");
            SinkOutcome::Disabled(reason.to_string())
        }
        Err(e) => {
            warn!(sink, error = %e, "Sink delivery failed.");
            SinkOutcome::Failed(e.to_string())
        }
    };
    metrics::counter!("sink_deliveries_total", "sink" => sink, "outcome" => outcome.label())
        .increment(1);
    outcome
}
