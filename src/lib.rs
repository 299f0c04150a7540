//! Workspace hub
//! Backend for a shared project workspace: one root directory, its file tree,
//! file CRUD and one interactive shell mirrored to every connected client.
//!
//! Module structure:
//! - commands: client event handlers (transport → services)
//! - services: tree building, root management, mutations, the shared terminal
//! - gateway: fan-out to clients and the WebSocket transport
//! - models: wire types

pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{Result, WorkspaceError};

use gateway::server::{self, AppState};
use gateway::ClientRegistry;
use services::{PtyLauncher, Workspace};
use std::sync::Arc;

/// Build the runtime and serve until Ctrl-C
pub fn run(config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.blocking_threads.max(1))
        .build()?;
    runtime.block_on(serve(config))
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let registry = Arc::new(ClientRegistry::new());
    let launcher = Arc::new(PtyLauncher::new(config.shell()));
    let workspace = Arc::new(Workspace::new(
        config.root()?,
        launcher,
        registry.clone(),
        config.terminal_size(),
    )?);

    // Eager start; a failure here is retried on the first terminal input
    if let Err(e) = workspace.start_terminal() {
        log::error!("Initial shell failed to start: {}", e);
    }

    let state = AppState {
        workspace: workspace.clone(),
        registry,
        allowed_origin: config.allowed_origin(),
    };

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Workspace backend listening on {}", addr);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    workspace.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}
