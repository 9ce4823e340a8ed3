// src/server/context.rs

use crate::connection::ConnectionRegistry;
use crate::core::state::ServerState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub state: Arc<ServerState>,
    pub registry: Arc<ConnectionRegistry>,
    pub listener: TcpListener,
    pub shutdown_tx: broadcast::Sender<()>,
    pub client_tasks: JoinSet<()>,
    pub connection_permits: Arc<Semaphore>,
}
