mod bootstrap;
mod chat;
mod health;
mod pdf;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cotation_core::config::{AppConfig, LoadOptions};

use crate::chat::ChatState;
use crate::health::HealthState;
use crate::telemetry::{init_logging, TracingAuditSink};

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let health_state =
        HealthState::new(app.engine.tables(), app.engine.current_year(), app.exports_pdf);
    let chat_state = ChatState {
        engine: app.engine.clone(),
        sessions: Arc::clone(&app.sessions),
        exports: Arc::clone(&app.exports),
        renderer: Arc::clone(&app.renderer),
        audit: Arc::new(TracingAuditSink),
    };
    let housekeeping =
        chat::spawn_housekeeping(Arc::clone(&app.sessions), Arc::clone(&app.exports));
    let router = chat::router(chat_state).merge(health::router(health_state));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "cotation-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "cotation-server stopping"
    );
    let _ = stop_tx.send(());
    housekeeping.abort();

    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            "in-flight requests did not finish within the grace period"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
