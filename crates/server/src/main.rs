// ABOUTME: newsdesk-server entry point: reads env config, builds state, serves the API until ctrl-c.
// ABOUTME: Starts the daily feed scheduler when RSS_SCHEDULER_ENABLED is set and stops it on shutdown.

use anyhow::{Context, Result};
use newsdesk_feed::IntakeScheduler;
use newsdesk_server::{router, telemetry, AppState, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let config = ServerConfig::from_env().context("reading server configuration")?;
    let state = AppState::build(&config).await?;

    let scheduler = IntakeScheduler::new(state.intake.clone(), config.schedule.clone());
    if config.scheduler_enabled {
        scheduler
            .start()
            .await
            .context("starting the RSS scheduler")?;
    } else {
        tracing::info!("RSS scheduler disabled");
    }

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "newsdesk server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down gracefully");
        })
        .await
        .context("serving HTTP")?;

    scheduler.stop().await;
    Ok(())
}
