//! Binwatch daemon: reads sensor distance lines from stdin, tracks bin fill levels,
//! and mails overflow alerts to the assigned cleaners.

mod app;
mod config;
mod input;

use std::{io, path::PathBuf, sync::Arc, sync::atomic::Ordering};

use anyhow::Result;
use binwatch_core::{
    ports::{BinStore, Notifier},
    service::BinWatchService,
};
use binwatch_notifier_mail::relay_notifier;
use binwatch_store_memory::MemoryStore;
use clap::Parser;
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::DaemonConfig;
use crate::input::Line;

#[derive(Debug, Parser)]
#[command(name = "binwatch", version, about = "Bin fill-level monitor and overflow alerter")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "binwatch.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DaemonConfig::load(&cli.config)?;

    // Store + notifier + service setup
    let client = Client::builder()
        .user_agent("binwatch/0.1")
        .timeout(config.mail.request_timeout())
        .build()?;
    let store = Arc::new(MemoryStore::new(config.seed_bins()));
    let notifier: Arc<dyn Notifier> = Arc::new(relay_notifier(client, &config.mail));
    let store_port: Arc<dyn BinStore> = Arc::<MemoryStore>::clone(&store);
    let service = Arc::new(BinWatchService::new(store_port, notifier, &config.alerts));

    info!(
        bins = config.bins.len(),
        interval_minutes = config.alerts.interval_minutes,
        relay = %config.mail.relay_url,
        "binwatch started"
    );

    let mut app = App::new(service);
    run(&mut app).await?;
    app.drain().await;

    let counters = &app.counters;
    info!(
        readings = counters.readings.load(Ordering::Relaxed),
        unresolved = counters.unresolved.load(Ordering::Relaxed),
        store_failures = counters.store_failures.load(Ordering::Relaxed),
        alerts = counters.alerts.load(Ordering::Relaxed),
        undelivered = counters.undelivered.load(Ordering::Relaxed),
        "reading feed closed"
    );
    for bin in store.bins() {
        info!(
            bin_id = %bin.id,
            name = %bin.name,
            fill = bin.current_fill_percentage,
            state = ?bin.alert_state(),
            "final bin state"
        );
    }

    Ok(())
}

async fn run(app: &mut App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0_usize;

    while let Some(raw) = lines.next_line().await? {
        line_no += 1;
        match input::parse_line(&raw) {
            Line::Skip => {}
            Line::Reading { sensor, distance } => app.submit(sensor, distance),
            Line::Malformed(reason) => warn!(line = line_no, %reason, "skipping malformed reading"),
        }
    }

    Ok(())
}
