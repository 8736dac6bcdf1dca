//! statuswatch -- uptime monitor for a remote search API.
//!
//! This crate probes the API health endpoint on a fixed interval, keeps a
//! bounded window of outcomes, and serves uptime and current-status
//! snapshots to the status page.

pub mod api;
pub mod config;
pub mod history;
pub mod probes;
pub mod scheduler;
pub mod status;

use anyhow::{Context, Result};
use std::sync::Arc;

pub use crate::config::{Config, ConfigError};
pub use crate::history::{CurrentStatus, HistoryStore, ServiceState};
pub use crate::probes::{HealthCheckOutcome, HealthPolicy, HealthProbe, HttpProbe};
pub use crate::scheduler::MonitorScheduler;
pub use crate::status::{StatusPageData, StatusService, UptimeGrade};

/// Start the statuswatch daemon: status service, monitor loop, and API server.
pub async fn serve(config: Config) -> Result<()> {
    // 1. Build the service
    let service = Arc::new(
        StatusService::new(&config.monitor).context("invalid monitor configuration")?,
    );
    tracing::info!(target_url = %config.monitor.target_url, "status service ready");

    // 2. Start monitoring, with an immediate first check so the page has data
    if config.monitor.autostart {
        service.start_monitoring(config.monitor.interval_ms)?;
        let initial = Arc::clone(&service);
        tokio::spawn(async move {
            initial.check_api_health().await;
        });
    }

    // 3. Start API server
    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;
    let app = api::router(api::state::AppState {
        service: Arc::clone(&service),
    });

    tracing::info!(%addr, "statuswatch listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.stop_monitoring();
    tracing::info!("statuswatch stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
