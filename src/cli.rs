//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. The settings flags are merged over the TOML file and
//! environment variables; the remaining flags describe the finding to
//! dispatch.

use crate::core::{Finding, Notice};
use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Fans a single finding out to every configured sink.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML settings file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the JSON sink configuration document.
    #[arg(long, value_name = "FILE")]
    pub sink_config: Option<PathBuf>,

    /// Directory for the per-plugin CSV exports.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Logging level (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Title of the finding.
    #[arg(long)]
    pub title: String,

    /// Name of the plugin that produced the finding.
    #[arg(long = "plugin")]
    pub plugin_name: String,

    /// Domain the finding belongs to.
    #[arg(long)]
    pub domain: String,

    /// Link to the finding; the deduplication key.
    #[arg(long)]
    pub link: String,

    #[arg(long, default_value = "")]
    pub result_type: String,

    #[arg(long, default_value = "")]
    pub output_file: String,

    #[arg(long, default_value_t = 0)]
    pub task_id: i64,

    /// Overrides the ticket and email subject.
    #[arg(long)]
    pub subject: Option<String>,

    /// Overrides the ticket and email body.
    #[arg(long)]
    pub body: Option<String>,

    /// Overrides the search index document id.
    #[arg(long)]
    pub index_key: Option<String>,
}

impl Cli {
    pub fn finding(&self) -> Finding {
        Finding {
            title: self.title.clone(),
            plugin_name: self.plugin_name.clone(),
            domain: self.domain.clone(),
            link: self.link.clone(),
            result_type: self.result_type.clone(),
            output_file: self.output_file.clone(),
            task_id: self.task_id,
        }
    }

    /// Builds the notice to dispatch, applying any text overrides.
    pub fn notice(&self) -> Notice {
        let mut notice = Notice::new(self.finding());
        if let Some(subject) = &self.subject {
            notice = notice.subject(subject.as_str());
        }
        if let Some(body) = &self.body {
            notice = notice.body(body.as_str());
        }
        if let Some(index_key) = &self.index_key {
            notice = notice.index_key(index_key.as_str());
        }
        notice
    }
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(path) = &self.sink_config {
            dict.insert(
                "sink_config_path".into(),
                Value::from(path.to_string_lossy().into_owned()),
            );
        }

        if let Some(dir) = &self.output_dir {
            let mut csv = Dict::new();
            csv.insert(
                "output_dir".into(),
                Value::from(dir.to_string_lossy().into_owned()),
            );
            dict.insert("csv".into(), Value::from(csv));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
