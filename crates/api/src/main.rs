use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_api::background;
use courier_api::config::{LogFormat, ServerConfig};
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_dispatch::DispatchConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "courier_api=debug,courier_dispatch=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_env() {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    // --- Configuration ---
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid server configuration");
            std::process::exit(1);
        }
    };
    let dispatch_config = match DispatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid dispatch configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        host = %config.host,
        port = config.port,
        start_job_timeout = ?dispatch_config.start_job_timeout,
        send_job_timeout = ?dispatch_config.send_job_timeout,
        poll_interval = ?dispatch_config.poll_interval,
        "Loaded configuration",
    );

    // --- Bus, registries, dispatcher ---
    let (state, ingest) = AppState::build(config.clone(), dispatch_config.clone());

    let ingest_cancel = CancellationToken::new();
    let ingest_handle = tokio::spawn(ingest.run(state.bus.subscribe_status(), ingest_cancel.clone()));
    tracing::info!("Status ingest started");

    let retention_handle = tokio::spawn(background::retention::run(
        Arc::clone(state.dispatcher.commands()),
        Arc::clone(&state.jobs),
        dispatch_config.status_retention,
        ingest_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

    // --- Start server ---
    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "Invalid bind address");
            std::process::exit(1);
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "Starting server");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop coordination tasks first; they may still be publishing.
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, state.dispatcher.stop_all())
        .await
        .is_err()
    {
        tracing::warn!(
            in_flight = state.dispatcher.in_flight(),
            "Coordination tasks did not stop in time",
        );
    }

    ingest_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), ingest_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Status ingest and retention stopped");

    drop(state);
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
