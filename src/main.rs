//! scrummage-connectors - delivers one finding to every configured sink.

use anyhow::Result;
use clap::Parser;
use scrummage_connectors::{cli::Cli, config::Settings, Dispatcher, JsonFileProvider};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load settings by layering sources: defaults, file, environment, and CLI args.
    let settings = Settings::load(&cli).unwrap_or_else(|err| {
        init_tracing("error");
        error!("Failed to load settings: {}", err);
        std::process::exit(1);
    });

    init_tracing(&settings.log_level);

    info!("-------------------- Settings --------------------");
    info!("Log Level: {}", settings.log_level);
    info!("Sink Configuration: {}", settings.sink_config_path.display());
    info!("CSV Output Directory: {}", settings.csv.output_dir.display());
    match settings.http.timeout_seconds {
        Some(seconds) => info!("HTTP Timeout: {}s", seconds),
        None => info!("HTTP Timeout: client default"),
    }
    info!("--------------------------------------------------");

    let provider = Arc::new(JsonFileProvider::new(&settings.sink_config_path));
    let dispatcher = Dispatcher::standard(provider, &settings)?;

    let report = dispatcher.dispatch(&cli.notice()).await;
    for (sink, outcome) in &report.outcomes {
        println!("{}: {}", sink, outcome);
    }

    Ok(())
}
