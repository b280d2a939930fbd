//! HTTP server startup and shutdown.

use tokio::net::TcpListener;
use tracing::info;

use crate::api::routes::{build_router, ApiState};
use crate::errors::{Error, Result};

/// Bind the configured address and serve until the process is signalled.
pub async fn start_api_server(state: ApiState) -> Result<()> {
    let address = state.config.server.bind_address();
    let router = build_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| Error::config(format!("Failed to bind {}: {}", address, e)))?;

    info!(%address, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
