// ABOUTME: Server binary entry point wiring configuration, logging, and the HTTP listener
// ABOUTME: Loads environment configuration, builds shared resources, and serves until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forgeguard server binary

use anyhow::Context;
use forgeguard::config::ServerConfig;
use forgeguard::logging::LoggingConfig;
use forgeguard::server::{self, ServerResources};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env()
        .init()
        .context("failed to initialize logging")?;

    let config = ServerConfig::from_env().context("failed to load configuration")?;

    let resources = Arc::new(
        ServerResources::new(config).map_err(|e| anyhow::anyhow!("startup failed: {e}"))?,
    );

    let maintenance = server::spawn_maintenance(Arc::clone(&resources));

    let result = server::run(resources).await;

    maintenance.abort();
    result
}
