// src/formatting.rs

use crate::core::Finding;
use chrono::{DateTime, Local};

/// Derives the texts sinks deliver for a finding.
pub trait TextFormatter: Send + Sync {
    fn subject(&self, finding: &Finding) -> String;
    fn body(&self, finding: &Finding) -> String;
    fn message(&self, finding: &Finding) -> String;
    fn index_key(&self, finding: &Finding) -> String;
}

/// The default formatter: plain text for tickets and email, Slack link markup
/// for chat.
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn subject(&self, finding: &Finding) -> String {
        format!("Scrummage {} result: {}", finding.plugin_name, finding.title)
    }

    fn body(&self, finding: &Finding) -> String {
        [
            ("Title", finding.title.as_str()),
            ("Plugin", finding.plugin_name.as_str()),
            ("Domain", finding.domain.as_str()),
            ("Link", finding.link.as_str()),
            ("Result Type", finding.result_type.as_str()),
            ("Output File", finding.output_file.as_str()),
        ]
        .iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .chain(std::iter::once(format!("Task ID: {}", finding.task_id)))
        .collect::<Vec<_>>()
        .join("\n")
    }

    fn message(&self, finding: &Finding) -> String {
        let label = if finding.domain.is_empty() {
            &finding.link
        } else {
            &finding.domain
        };
        format!(
            "[{}] {} -> <{}|{}>",
            finding.plugin_name, finding.title, finding.link, label
        )
    }

    fn index_key(&self, finding: &Finding) -> String {
        let digest = blake3::hash(finding.link.as_bytes()).to_hex();
        format!(
            "{}-{}-{}",
            concat_plugin_name(&finding.plugin_name),
            finding.task_id,
            &digest.as_str()[..12]
        )
    }
}

/// Formats a timestamp the way the result stores and exports record it,
/// e.g. `2024-05-01 09:30:00.000000`.
pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Collapses a plugin name into a lowercase identifier without whitespace.
pub fn concat_plugin_name(plugin_name: &str) -> String {
    plugin_name
        .split_whitespace()
        .collect::<String>()
        .to_lowercase()
}
