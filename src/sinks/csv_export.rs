//! Appends findings to per-plugin CSV files.

use super::settle;
use crate::core::{Delivery, Finding, Notice, Sink};
use crate::error::SinkError;
use crate::formatting::format_timestamp;
use crate::resolver::{resolve, ConfigProvider, Resolved, SinkSettings};
use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Header row written when a file is created.
pub const HEADINGS: [&str; 8] = [
    "Title",
    "Plugin",
    "Domain",
    "Link",
    "Created At",
    "Output File",
    "Result Type",
    "Task ID",
];

/// The `csv` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CsvExportSettings {
    #[serde(rename = "use-csv")]
    pub use_csv: bool,
}

impl SinkSettings for CsvExportSettings {
    const SECTION: &'static str = "csv";
    const REQUIRED: &'static [&'static str] = &["use-csv"];
}

/// An append-only log of findings, one file per plugin. No deduplication.
pub struct CsvExportSink {
    config: Arc<dyn ConfigProvider>,
    output_dir: PathBuf,
    // Serialises appends so a new file gets exactly one header row.
    write_lock: Mutex<()>,
}

impl CsvExportSink {
    pub const NAME: &'static str = "csv";

    pub fn new<P: AsRef<Path>>(config: Arc<dyn ConfigProvider>, output_dir: P) -> Self {
        Self {
            config,
            output_dir: output_dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the export file for `plugin_name`, e.g. `Domain FuzzerOutput.csv`.
    pub fn file_for(&self, plugin_name: &str) -> PathBuf {
        let safe: String = plugin_name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.output_dir.join(format!("{}Output.csv", safe))
    }

    #[instrument(skip_all, fields(plugin = %finding.plugin_name))]
    pub async fn try_append(&self, finding: &Finding) -> Result<Delivery, SinkError> {
        if let Resolved::Disabled(reason) = resolve::<CsvExportSettings>(self.config.as_ref()) {
            return Ok(Delivery::Disabled(reason));
        }

        let output_dir = self.output_dir.clone();
        let path = self.file_for(&finding.plugin_name);
        let row = row_for(finding);

        let _guard = self.write_lock.lock().await;
        let created = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || write_row(&output_dir, &path, &row)).await??
        };

        if created {
            info!(path = %path.display(), "CSV output file created.");
        } else {
            info!(path = %path.display(), "CSV output file updated.");
        }
        Ok(Delivery::Delivered)
    }

    pub async fn append(&self, finding: &Finding) {
        settle(Self::NAME, self.try_append(finding).await);
    }
}

fn row_for(finding: &Finding) -> [String; 8] {
    [
        finding.title.clone(),
        finding.plugin_name.clone(),
        finding.domain.clone(),
        finding.link.clone(),
        format_timestamp(Local::now()),
        finding.output_file.clone(),
        finding.result_type.clone(),
        finding.task_id.to_string(),
    ]
}

/// Appends `row` to `path`, writing the header first when the file is new.
/// Returns whether the file was created.
fn write_row(output_dir: &Path, path: &Path, row: &[String; 8]) -> Result<bool, SinkError> {
    fs::create_dir_all(output_dir)?;
    let created = !path.exists();

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if created {
        writer.write_record(HEADINGS)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(created)
}

#[async_trait]
impl Sink for CsvExportSink {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, notice: &Notice) -> Result<Delivery, SinkError> {
        self.try_append(&notice.finding).await
    }
}
