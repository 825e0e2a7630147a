pub mod routes;

pub use routes::{build_routes, HealthResponse, ServiceInfo};

use crate::stats::ServiceStats;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Shared state for the health listener.
#[derive(Clone)]
pub struct GatewayState {
    pub stats: Arc<ServiceStats>,
    pub max_size_mb: u64,
    pub version: String,
}

/// Serve the health endpoint until a shutdown signal arrives.
pub async fn serve(state: GatewayState, addr: SocketAddr) -> Result<()> {
    let app = build_routes(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("health endpoint listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("health endpoint shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down health endpoint");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down health endpoint");
        }
    }
}
