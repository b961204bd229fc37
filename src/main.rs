use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use push_dispatch_service::config::Settings;
use push_dispatch_service::metrics::ServiceMetrics;
use push_dispatch_service::server::{create_app, AppState};
use push_dispatch_service::store::create_directory_store;
use push_dispatch_service::tasks::{NonSubscribedNotifier, Scheduler, SelfPingTask};
use push_dispatch_service::telemetry::init_telemetry;
use push_dispatch_service::transport::create_transport;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Collaborators are built once and injected
    let store = create_directory_store(&settings.database).await?;
    let transport = create_transport(&settings.fcm);
    ServiceMetrics::set_transport_configured(transport.is_configured());

    let state = AppState::new(settings.clone(), store, transport);
    tracing::info!(
        directory = state.store.backend_name(),
        transport_configured = state.transport.is_configured(),
        "Application state initialized"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start scheduled tasks in background
    let task_handles = if settings.scheduler.enabled {
        let notifier = NonSubscribedNotifier::new(state.notifications.clone());
        let self_ping = SelfPingTask::new(
            settings.self_ping_url(),
            Duration::from_secs(settings.scheduler.self_ping_timeout_seconds),
        );
        tracing::info!(url = %self_ping.url(), "Self-ping target configured");

        Scheduler::new(shutdown_tx.clone())
            .register(
                Arc::new(notifier),
                Duration::from_secs(settings.scheduler.notifier_interval_seconds),
            )
            .register(
                Arc::new(self_ping),
                Duration::from_secs(settings.scheduler.self_ping_interval_seconds),
            )
            .start()
    } else {
        tracing::info!("Scheduler disabled");
        Vec::new()
    };

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for scheduled tasks to stop...");
    futures::future::join_all(task_handles).await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop scheduled tasks
    let _ = shutdown_tx.send(());
}
