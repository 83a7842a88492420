//! Application settings for scrummage-connectors
//!
//! This module defines the `Settings` struct used to assemble the dispatcher.
//! It uses the `figment` crate to layer built-in defaults, an optional TOML
//! file, environment variables and command-line flags. The per-sink
//! connection details live in a separate JSON document, see
//! [`crate::resolver`].

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The main settings struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// The logging level for the application.
    pub log_level: String,
    /// Path to the JSON document holding the sink sections.
    pub sink_config_path: PathBuf,
    /// Settings for the flat-file export.
    #[serde(default)]
    pub csv: CsvSettings,
    /// Settings shared by the HTTP-based sinks.
    #[serde(default)]
    pub http: HttpSettings,
}

/// Settings for the flat-file export.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CsvSettings {
    /// Directory the per-plugin CSV files are written to.
    pub output_dir: PathBuf,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("static/protected/output"),
        }
    }
}

/// Settings shared by the HTTP-based sinks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct HttpSettings {
    /// Request timeout. Unset means the client library default.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Settings {
    /// Loads the application settings.
    ///
    /// Sources, lowest precedence first: defaults, the TOML file named by
    /// `--config` (if any), `SCRUMMAGE_*` environment variables, then the
    /// command-line flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let settings: Settings = figment
            // e.g. SCRUMMAGE_CSV__OUTPUT_DIR=/var/lib/scrummage/output
            .merge(Env::prefixed("SCRUMMAGE_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sink_config_path: PathBuf::from("plugins/common/configuration/config.json"),
            csv: CsvSettings::default(),
            http: HttpSettings::default(),
        }
    }
}
