use tracing::{error, info};

/// Resolves on ctrl-c. If the signal handler cannot be installed, never resolves.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received ctrl-c"),
        Err(err) => {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}
