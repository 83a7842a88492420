//! Fans a notice out to every sink.

use crate::config::Settings;
use crate::core::{Notice, Sink, SinkOutcome};
use crate::http::build_client;
use crate::resolver::ConfigProvider;
use crate::sinks::{
    settle, CsvExportSink, DefectDojoSink, ElasticsearchSink, EmailSink, JiraSink,
    PrimaryStoreSink, RtirSink, ScumblrSink, SlackSink,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument};

/// The per-sink outcomes of one dispatch, in sink order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<(&'static str, SinkOutcome)>,
}

impl DispatchReport {
    pub fn outcome(&self, sink: &str) -> Option<&SinkOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| *name == sink)
            .map(|(_, outcome)| outcome)
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, SinkOutcome::Delivered))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, SinkOutcome::Failed(_)))
            .count()
    }
}

/// Delivers notices to a fixed set of sinks.
///
/// Sinks run concurrently on the caller's task. Each one settles its own
/// result, so a failure in one never affects another and nothing is
/// returned as an error.
pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink>>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Wires every built-in sink to `config`.
    pub fn standard(
        config: Arc<dyn ConfigProvider>,
        settings: &Settings,
    ) -> Result<Self, reqwest::Error> {
        let client = build_client(&settings.http)?;
        let sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(CsvExportSink::new(config.clone(), &settings.csv.output_dir)),
            Box::new(PrimaryStoreSink::new(config.clone())),
            Box::new(ScumblrSink::new(config.clone())),
            Box::new(ElasticsearchSink::new(config.clone(), client.clone())),
            Box::new(DefectDojoSink::new(config.clone(), client.clone())),
            Box::new(JiraSink::new(config.clone(), client.clone())),
            Box::new(RtirSink::new(config.clone(), client.clone())),
            Box::new(SlackSink::new(config.clone(), client)),
            Box::new(EmailSink::new(config)),
        ];
        Ok(Self::new(sinks))
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    #[instrument(skip_all, fields(link = %notice.finding.link, plugin = %notice.finding.plugin_name))]
    pub async fn dispatch(&self, notice: &Notice) -> DispatchReport {
        let deliveries = self.sinks.iter().map(|sink| async move {
            let outcome = settle(sink.name(), sink.deliver(notice).await);
            (sink.name(), outcome)
        });
        let report = DispatchReport {
            outcomes: join_all(deliveries).await,
        };
        info!(
            delivered = report.delivered(),
            failed = report.failed(),
            "Dispatch finished."
        );
        report
    }
}
