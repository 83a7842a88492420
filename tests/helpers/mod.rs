#![allow(dead_code)]
//! Shared fixtures for the integration tests.


use scrummage_connectors::Finding;
use serde_json::Value;
use std::io::Write;
use tempfile::NamedTempFile;

/// A finding from a typical plugin run.
pub fn sample_finding(link: &str) -> Finding {
    Finding {
        title: "Suspicious domain registered".to_string(),
        plugin_name: "Domain Fuzzer".to_string(),
        domain: "examp1e.com".to_string(),
        link: link.to_string(),
        result_type: "Domain Spoof".to_string(),
        output_file: "static/protected/output/domainfuzzer-1.txt".to_string(),
        task_id: 1,
    }
}

/// Writes a sink configuration document to a temporary file.
pub fn write_config(document: &Value) -> NamedTempFile {
    write_raw_config(&document.to_string())
}

pub fn write_raw_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}
