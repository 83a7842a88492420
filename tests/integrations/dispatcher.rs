//! Integration tests for fanning a notice out to several sinks.

#[path = "../helpers/mod.rs"]
mod helpers;

use async_trait::async_trait;
use helpers::memory_store::MemoryConnector;
use helpers::sample_finding;
use scrummage_connectors::config::Settings;
use scrummage_connectors::sinks::{CsvExportSink, PrimaryStoreSink, ScumblrSink};
use scrummage_connectors::{
    ConfigError, Delivery, DispatchReport, Dispatcher, Notice, Sink, SinkError, SinkOutcome,
    StaticConfig,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A sink that counts deliveries and answers with a fixed result.
struct ScriptedSink {
    name: &'static str,
    answer: fn() -> Result<Delivery, SinkError>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSink {
    fn boxed(name: &'static str, answer: fn() -> Result<Delivery, SinkError>) -> (Box<dyn Sink>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Self {
            name,
            answer,
            calls: calls.clone(),
        };
        (Box::new(sink), calls)
    }
}

#[async_trait]
impl Sink for ScriptedSink {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, _notice: &Notice) -> Result<Delivery, SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.answer)()
    }
}

#[tokio::test]
async fn test_failure_in_one_sink_does_not_stop_the_others() {
    let (failing, failing_calls) = ScriptedSink::boxed("jira", || {
        Err(SinkError::Rejected {
            service: "JIRA",
            reason: "project does not exist".to_string(),
        })
    });
    let (first, first_calls) = ScriptedSink::boxed("csv", || Ok(Delivery::Delivered));
    let (last, last_calls) = ScriptedSink::boxed("slack", || Ok(Delivery::Delivered));
    let dispatcher = Dispatcher::new(vec![first, failing, last]);

    let report = dispatcher.dispatch(&Notice::new(sample_finding("http://x"))).await;

    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(failing_calls.load(Ordering::SeqCst), 1);
    assert_eq!(last_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.delivered(), 2);
    assert_eq!(report.failed(), 1);
    assert!(matches!(report.outcome("jira"), Some(SinkOutcome::Failed(reason)) if reason.contains("project does not exist")));
}

#[tokio::test]
async fn test_report_keeps_sink_order() {
    let (a, _) = ScriptedSink::boxed("postgresql", || Ok(Delivery::Duplicate));
    let (b, _) = ScriptedSink::boxed("email", || {
        Ok(Delivery::Disabled(ConfigError::MissingSection("email".to_string())))
    });
    let (c, _) = ScriptedSink::boxed("rtir", || Err(SinkError::Email));
    let dispatcher = Dispatcher::new(vec![a, b, c]);

    let report = dispatcher.dispatch(&Notice::new(sample_finding("http://x"))).await;

    let names: Vec<_> = report.outcomes.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["postgresql", "email", "rtir"]);
    assert_eq!(report.outcome("postgresql"), Some(&SinkOutcome::Duplicate));
    assert!(matches!(report.outcome("email"), Some(SinkOutcome::Disabled(_))));
    assert!(matches!(report.outcome("rtir"), Some(SinkOutcome::Failed(_))));
}

#[tokio::test]
async fn test_empty_dispatcher_reports_nothing() {
    let report = Dispatcher::new(Vec::new())
        .dispatch(&Notice::new(sample_finding("http://x")))
        .await;

    assert_eq!(report, DispatchReport::default());
}

#[tokio::test]
async fn test_stores_and_csv_share_one_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(StaticConfig(json!({
        "csv": [{ "use-csv": true }],
        "postgresql": [{ "host": "db", "port": 5432, "user": "u", "password": "p", "database": "scrummage" }],
        "scumblr": [{ "host": "db", "port": "5433", "user": "u", "password": "p", "database": "scumblr" }]
    })));
    let connector = Arc::new(MemoryConnector::new());
    let dispatcher = Dispatcher::new(vec![
        Box::new(CsvExportSink::new(config.clone(), dir.path())),
        Box::new(PrimaryStoreSink::with_connector(config.clone(), connector.clone())),
        Box::new(ScumblrSink::with_connector(config, connector.clone())),
    ]);
    let notice = Notice::new(sample_finding("http://x"));

    let first = dispatcher.dispatch(&notice).await;
    let second = dispatcher.dispatch(&notice).await;

    assert_eq!(first.delivered(), 3);
    assert_eq!(second.outcome("csv"), Some(&SinkOutcome::Delivered));
    assert_eq!(second.outcome("postgresql"), Some(&SinkOutcome::Duplicate));
    assert_eq!(second.outcome("scumblr"), Some(&SinkOutcome::Duplicate));
    assert_eq!(connector.rows_for("http://x").len(), 2);

    let csv = std::fs::read_to_string(dir.path().join("Domain FuzzerOutput.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
}

#[tokio::test]
async fn test_standard_dispatcher_with_nothing_configured() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.csv.output_dir = dir.path().to_path_buf();
    let dispatcher = Dispatcher::standard(Arc::new(StaticConfig(json!({}))), &settings).unwrap();

    let report = dispatcher.dispatch(&Notice::new(sample_finding("http://x"))).await;

    assert_eq!(report.outcomes.len(), 9);
    assert!(report
        .outcomes
        .iter()
        .all(|(_, outcome)| matches!(outcome, SinkOutcome::Disabled(_))));
}
