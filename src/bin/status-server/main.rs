mod args;

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context as _, Result};
use args::Args;
use beacon_status::{
    db::{PgStatusStore, migrate, new_pool},
    http,
    ingest::IngestionService,
    shutdown::shutdown_signal,
    telemetry,
};
use clap::Parser as _;
use tokio::net::TcpListener;
use tracing::info;

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

    let pool = new_pool(&args.database_url, args.max_connections)
        .await
        .context("failed to create database pool")?;

    migrate(&pool).await?;

    let service = IngestionService::new(Arc::new(PgStatusStore::new(pool)));

    let listener = TcpListener::bind(args.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.listen_addr))?;

    info!(addr = %args.listen_addr, "status-server listening");

    http::serve(listener, service, shutdown_signal()).await
}
