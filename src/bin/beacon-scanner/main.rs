mod args;
mod ble;

use std::{process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context as _, Result, anyhow};
use args::Args;
use beacon_status::{
    classifier::ThresholdClassifier, consumer::StreamConsumer, shutdown::shutdown_signal,
    telemetry, transport::HttpStatusTransport,
};
use btleplug::{
    api::{Central, Manager as _, ScanFilter},
    platform::Manager,
};
use clap::Parser as _;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::ble::forward_readings;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    telemetry::init();

    let transport = HttpStatusTransport::new(
        &args.ingest_url,
        Duration::from_secs(args.request_timeout_secs),
    )
    .context("failed to create status transport")?;

    let classifier = ThresholdClassifier::new(args.activity_attribute, args.activity_threshold);

    info!(
        endpoint = transport.endpoint(),
        attribute = classifier.attribute(),
        threshold = classifier.threshold(),
        "Starting beacon scanner"
    );

    let consumer = StreamConsumer::new(Arc::new(classifier), Arc::new(transport));

    let manager = Manager::new()
        .await
        .context("failed to initialize Bluetooth manager")?;

    let adapters = manager
        .adapters()
        .await
        .context("failed to get Bluetooth adapters")?;

    let adapter = adapters
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no Bluetooth adapters found"))?;

    adapter
        .start_scan(ScanFilter::default())
        .await
        .context("failed to start BLE scan")?;

    let (sender, receiver) = mpsc::channel(args.reading_buffer.get());
    let source = tokio::spawn(forward_readings(adapter, sender));

    consumer
        .run(ReceiverStream::new(receiver), shutdown_signal())
        .await;

    source.abort();
    if let Ok(Err(err)) = source.await {
        return Err(err.context("BLE reading source failed"));
    }

    Ok(())
}
