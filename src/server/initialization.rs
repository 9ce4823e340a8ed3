// src/server/initialization.rs

//! Handles server initialization: binding the listener and assembling the
//! run context around an already-constructed state graph.

use super::context::ServerContext;
use crate::connection::ConnectionRegistry;
use crate::core::state::ServerState;
use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tracing::info;

/// Initializes all server components before starting the main loop.
pub async fn setup(
    state: Arc<ServerState>,
    registry: Arc<ConnectionRegistry>,
) -> Result<ServerContext> {
    log_startup_info(&state);
    let (shutdown_tx, _) = broadcast::channel(1);

    let listener =
        TcpListener::bind((state.config.host.as_str(), state.config.port)).await?;
    info!(
        "duplexd server listening on {}:{}",
        state.config.host, state.config.port
    );
    let connection_permits = Arc::new(Semaphore::new(state.config.max_clients));

    Ok(ServerContext {
        state,
        registry,
        listener,
        shutdown_tx,
        client_tasks: JoinSet::new(),
        connection_permits,
    })
}

fn log_startup_info(state: &Arc<ServerState>) {
    let config = &state.config;
    info!(
        "Starting duplexd: back_pressure_size {}, recreate_coder_attempts_count {}, \
         disconnect_on_unhandled {}, max_message_size {} MB, async_handlers {}",
        config.back_pressure_size,
        config.recreate_coder_attempts_count,
        config.disconnect_on_unhandled,
        config.max_message_size_mb,
        config.async_handlers,
    );
}
