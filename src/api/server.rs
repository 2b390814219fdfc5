use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

/// Serves the router until Ctrl-C. In-flight requests are allowed to finish.
pub async fn run_server(router: Router, listener: TcpListener) -> anyhow::Result<()> {
    info!("Fraud alert API listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Fraud alert API stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = signal::ctrl_c().await {
        warn!("Could not listen for the shutdown signal: {error}");
        std::future::pending::<()>().await;
    }
}
