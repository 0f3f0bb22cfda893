mod app;
mod config;
mod error;
mod routes;
mod services;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::config::StateConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let state_config = StateConfig::from_env();
    if !state_config.dataset_dir.is_dir() {
        tracing::warn!(
            dataset_dir = %state_config.dataset_dir.display(),
            "dataset directory does not exist; no historical dates will be served"
        );
    }
    if state_config.google_api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY is not set; chat replies will explain how to enable it");
    }

    let state = AppState::new(state_config);
    match state.datasets.available_dates().await {
        Ok(dates) => tracing::info!(
            count = dates.len(),
            first = dates.first().unwrap_or("-"),
            last = dates.last().unwrap_or("-"),
            "dataset catalogue scanned"
        ),
        Err(e) => tracing::warn!(error = %e, "initial dataset scan failed"),
    }

    let app = app::build_app(state);

    let addr = config::bind_addr();
    tracing::info!("Icewatch server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
