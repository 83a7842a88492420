//! Resolution of per-sink configuration sections.
//!
//! Every sink describes its section with [`SinkSettings`] and resolves it on
//! each delivery through a [`ConfigProvider`], so edits to the configuration
//! document are picked up without a restart. Resolution never fails hard: an
//! unreadable document, a missing section or an incomplete one all produce
//! [`Resolved::Disabled`].

use crate::error::ConfigError;
use figment::{
    providers::{Format, Json},
    Figment,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies the sink configuration document.
pub trait ConfigProvider: Send + Sync {
    /// Loads the current document. Called once per resolution.
    fn load(&self) -> Result<Value, ConfigError>;
}

/// Reads the document from a JSON file on every load.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for JsonFileProvider {
    fn load(&self) -> Result<Value, ConfigError> {
        if !self.path.is_file() {
            return Err(ConfigError::Load(format!(
                "{} does not exist",
                self.path.display()
            )));
        }
        Figment::from(Json::file(&self.path))
            .extract::<Value>()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }
}

/// An in-memory document.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub Value);

impl ConfigProvider for StaticConfig {
    fn load(&self) -> Result<Value, ConfigError> {
        Ok(self.0.clone())
    }
}

/// A typed configuration section.
pub trait SinkSettings: DeserializeOwned {
    /// Name of the section in the configuration document.
    const SECTION: &'static str;
    /// Fields that must be present and truthy for the sink to be enabled.
    const REQUIRED: &'static [&'static str];
}

/// The outcome of resolving one section.
#[derive(Debug)]
pub enum Resolved<T> {
    Enabled(T),
    Disabled(ConfigError),
}

impl<T> Resolved<T> {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Resolved::Enabled(_))
    }

    pub fn into_result(self) -> Result<T, ConfigError> {
        match self {
            Resolved::Enabled(settings) => Ok(settings),
            Resolved::Disabled(reason) => Err(reason),
        }
    }
}

/// Loads the document from `provider` and resolves the section for `T`.
pub fn resolve<T: SinkSettings>(provider: &dyn ConfigProvider) -> Resolved<T> {
    debug!(section = T::SECTION, "Loading sink configuration.");
    let resolved = provider.load().and_then(|document| {
        let record = resolve_section(&document, T::SECTION, T::REQUIRED)?;
        serde_json::from_value::<T>(Value::Object(record)).map_err(|e| ConfigError::Malformed {
            section: T::SECTION.to_string(),
            reason: e.to_string(),
        })
    });

    match resolved {
        Ok(settings) => Resolved::Enabled(settings),
        Err(reason) => {
            debug!(section = T::SECTION, %reason, "Sink configuration unavailable.");
            Resolved::Disabled(reason)
        }
    }
}

/// Extracts a section record and checks its required fields.
///
/// A section is either an object or a list of objects, in which case the
/// last entry wins.
pub fn resolve_section(
    document: &Value,
    section: &str,
    required: &[&str],
) -> Result<Map<String, Value>, ConfigError> {
    let raw = document
        .get(section)
        .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;

    let record = match raw {
        Value::Object(record) => record,
        Value::Array(entries) => entries
            .last()
            .and_then(Value::as_object)
            .ok_or_else(|| ConfigError::Malformed {
                section: section.to_string(),
                reason: "expected a non-empty list of objects".to_string(),
            })?,
        other => {
            return Err(ConfigError::Malformed {
                section: section.to_string(),
                reason: format!("expected an object, found {}", kind(other)),
            })
        }
    };

    let missing: Vec<String> = required
        .iter()
        .filter(|field| !record.get(**field).is_some_and(is_truthy))
        .map(|field| field.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ConfigError::Incomplete {
            section: section.to_string(),
            fields: missing,
        });
    }

    Ok(record.clone())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
