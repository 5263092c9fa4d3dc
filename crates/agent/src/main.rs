//! Tempo agent binary
//!
//! Capture-and-forward daemon: samples the foreground application, tracks
//! idle time, spools screenshots, and drains the local observation queues
//! to the ingestion API.

mod context;

use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::context::AgentContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; absence is not an error.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = tempo_infra::config::load();
    info!(base_url = %config.api.base_url, "starting tempo agent");

    let mut context = AgentContext::build(&config)?;
    context.start().await;

    // Capture ticks are driven here; the gate inside the service decides
    // which ticks actually sample.
    let capture = context.capture.clone();
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            if let Err(err) = capture.tick().await {
                warn!(error = %err, "capture tick failed");
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    ticker.abort();
    context.shutdown().await;
    Ok(())
}
