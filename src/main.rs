// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{anyhow, Context};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use vinted_agent::app::{create_router, AppState, VERSION};
use vinted_agent::models::settings::Config;
use vinted_agent::services::logging::init_logging;
use vinted_agent::services::scrape::ScrapeService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    // Flags win over environment variables, which win over defaults
    let config = Config::parse();
    config
        .scraper
        .validate()
        .map_err(|e| anyhow!("invalid scraper configuration: {e}"))?;

    info!(
        program = %config.scraper.program,
        invocation = %config.scraper.invocation,
        timeout_secs = config.scraper.timeout_secs,
        database_file = %config.scraper.database_file,
        "scraper configured"
    );

    let state = AppState {
        scrape_service: Arc::new(ScrapeService::new(config.scraper.clone())),
        cors_allowed_origins: config.cors_allowed_origins.clone(),
    };

    let app = create_router(state);

    // Bind to 0.0.0.0 to accept connections from any network interface (required for Docker)
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "vinted-agent v{} listening", VERSION);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
